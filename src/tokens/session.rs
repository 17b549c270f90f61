//! Signed session tokens (HS256 JWT)
//!
//! A session token carries only the role and its expiry. Validity is a
//! function of the signature, the expiry and the role; there is no
//! server-side revocation list.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Expiry, unix seconds
    pub exp: i64,
    /// Issued at, unix seconds
    pub iat: i64,
    pub role: Role,
}

impl SessionClaims {
    pub fn admin(issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            exp: (issued_at + ttl).timestamp(),
            iat: issued_at.timestamp(),
            role: Role::Admin,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Sign claims with the given key
pub fn sign(claims: &SessionClaims, signing_key: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(signing_key.as_bytes()),
    )
}

/// Decode and check a token. Any failure (format, signature, role, expiry)
/// yields `None`.
pub fn verify(token: &str, signing_key: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked against the injected clock below
    validation.validate_exp = false;

    let claims = match decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(signing_key.as_bytes()),
        &validation,
    ) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::debug!(error = %e, "Session token rejected");
            return None;
        }
    };

    if claims.is_expired_at(now) {
        tracing::debug!(exp = claims.exp, "Session token expired");
        return None;
    }

    (claims.role == Role::Admin).then_some(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_sign_and_verify() {
        let now = Utc::now();
        let token = sign(&SessionClaims::admin(now, Duration::hours(1)), KEY).unwrap();

        let claims = verify(&token, KEY, now).unwrap();
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp, now.timestamp() + 3600);
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now();
        let token = sign(&SessionClaims::admin(now, Duration::hours(1)), KEY).unwrap();

        assert!(verify(&token, KEY, now + Duration::minutes(59)).is_some());
        assert!(verify(&token, KEY, now + Duration::hours(1)).is_none());
        assert!(verify(&token, KEY, now + Duration::hours(2)).is_none());
    }

    #[test]
    fn test_foreign_signature() {
        let now = Utc::now();
        let token = sign(&SessionClaims::admin(now, Duration::hours(1)), "some-other-key").unwrap();

        assert!(verify(&token, KEY, now).is_none());
    }

    #[test]
    fn test_tampered_payload() {
        let now = Utc::now();
        let token = sign(&SessionClaims::admin(now, Duration::hours(1)), KEY).unwrap();

        // Swap the payload for one with a later expiry, keeping the old signature
        let forged_claims = SessionClaims::admin(now, Duration::days(365));
        let forged = sign(&forged_claims, KEY).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert!(verify(&tampered, KEY, now).is_none());
    }

    #[test]
    fn test_garbage_token() {
        assert!(verify("not-a-jwt", KEY, Utc::now()).is_none());
        assert!(verify("", KEY, Utc::now()).is_none());
    }

    #[test]
    fn test_non_admin_role_is_rejected() {
        #[derive(Serialize)]
        struct OtherClaims {
            exp: i64,
            iat: i64,
            role: &'static str,
        }

        let now = Utc::now();
        let claims = OtherClaims {
            exp: now.timestamp() + 3600,
            iat: now.timestamp(),
            role: "viewer",
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(KEY.as_bytes()),
        )
        .unwrap();

        assert!(verify(&token, KEY, now).is_none());
    }
}
