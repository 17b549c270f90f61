use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three secrets the gate depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecretKey {
    /// HMAC key used to sign session tokens
    SigningKey,
    /// Static bearer token for machine-to-machine calls
    ApiToken,
    /// Administrator password
    AdminSecret,
}

impl SecretKey {
    pub const ALL: [SecretKey; 3] = [
        SecretKey::SigningKey,
        SecretKey::ApiToken,
        SecretKey::AdminSecret,
    ];

    /// Name used as the storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKey::SigningKey => "SIGNING_KEY",
            SecretKey::ApiToken => "API_TOKEN",
            SecretKey::AdminSecret => "ADMIN_SECRET",
        }
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSecretKey(pub String);

impl fmt::Display for UnknownSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown secret key: {}", self.0)
    }
}

impl std::error::Error for UnknownSecretKey {}

impl FromStr for SecretKey {
    type Err = UnknownSecretKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SecretKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownSecretKey(s.to_string()))
    }
}

/// A persisted secret
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRecord {
    pub key: SecretKey,
    /// Refreshed on every upsert
    pub updated_at: DateTime<Utc>,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_key_names_round_trip() {
        for key in SecretKey::ALL {
            assert_eq!(key.as_str().parse::<SecretKey>().unwrap(), key);
        }
        assert!("JWT_SECRET".parse::<SecretKey>().is_err());
    }
}
