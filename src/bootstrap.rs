//! One-time system initialization and secret rotation
//!
//! The system is initialized as soon as the secret store holds at least one
//! record. `initialize` writes all three secrets in a single store
//! transaction and is single-flight within the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::ConfigCache;
use crate::error::AuthError;
use crate::storage::{SecretKey, SecretStore};
use crate::tokens::{generate_key, generate_password};

/// Length of generated administrator passwords
pub const GENERATED_PASSWORD_LEN: usize = 16;

/// Outcome of an [`InitializationManager::initialize`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// Secrets already existed; nothing was written
    AlreadyInitialized,
    Initialized {
        /// Set when no password was supplied and one was generated
        generated_password: Option<String>,
    },
}

pub struct InitializationManager {
    init_lock: Mutex<()>,
    initialized: AtomicBool,
    min_password_len: usize,
    secrets: Arc<ConfigCache>,
}

impl InitializationManager {
    pub fn new(secrets: Arc<ConfigCache>, min_password_len: usize) -> Self {
        Self {
            init_lock: Mutex::new(()),
            initialized: AtomicBool::new(false),
            min_password_len,
            secrets,
        }
    }

    fn store(&self) -> &Arc<dyn SecretStore> {
        self.secrets.store()
    }

    /// True once the store holds any secret. Latched after the first
    /// positive answer since secrets are never deleted.
    pub fn is_initialized(&self) -> Result<bool, AuthError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(true);
        }

        let initialized = self.store().count()? > 0;
        if initialized {
            self.initialized.store(true, Ordering::Release);
        }
        Ok(initialized)
    }

    /// Generate and persist every secret. No-op when already initialized.
    pub fn initialize(&self, admin_password: Option<&str>) -> Result<InitOutcome, AuthError> {
        let _guard = self.init_lock.lock().unwrap_or_else(|e| e.into_inner());

        if self.is_initialized()? {
            tracing::debug!("Initialize called on an initialized system; ignoring");
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let (admin_secret, generated_password) = match admin_password {
            Some(password) => {
                self.validate_password(password)?;
                (password.to_string(), None)
            }
            None => {
                let password = generate_password(GENERATED_PASSWORD_LEN);
                (password.clone(), Some(password))
            }
        };

        self.store().upsert_all(&[
            (SecretKey::SigningKey, generate_key()),
            (SecretKey::ApiToken, generate_key()),
            (SecretKey::AdminSecret, admin_secret),
        ])?;

        for key in SecretKey::ALL {
            self.secrets.invalidate(key);
        }
        self.initialized.store(true, Ordering::Release);

        tracing::info!(
            generated_password = generated_password.is_some(),
            "System initialized"
        );
        Ok(InitOutcome::Initialized { generated_password })
    }

    /// Replace the administrator password
    pub fn update_password(&self, new_password: &str) -> Result<(), AuthError> {
        self.validate_password(new_password)?;
        self.write_secret(SecretKey::AdminSecret, new_password)?;
        tracing::info!("Administrator password updated");
        Ok(())
    }

    /// Replace a secret with a freshly generated value and return it.
    ///
    /// Rotating the signing key invalidates every outstanding session token
    /// once cached validations expire.
    pub fn regenerate_key(&self, key: SecretKey) -> Result<String, AuthError> {
        let value = match key {
            SecretKey::SigningKey | SecretKey::ApiToken => generate_key(),
            SecretKey::AdminSecret => generate_password(GENERATED_PASSWORD_LEN),
        };
        self.write_secret(key, &value)?;
        tracing::info!(key = %key, "Secret regenerated");
        Ok(value)
    }

    fn write_secret(&self, key: SecretKey, value: &str) -> Result<(), AuthError> {
        self.store().upsert(key, value)?;
        self.secrets.invalidate(key);
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    fn validate_password(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.min_password_len {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::Database;
    use crate::testutil::{setup_db, FailingStore};
    use chrono::Duration;

    fn manager(db: &Database) -> InitializationManager {
        let cache = Arc::new(ConfigCache::new(
            Arc::new(db.clone()),
            Duration::minutes(5),
            Arc::new(ManualClock::default()),
        ));
        InitializationManager::new(cache, 8)
    }

    fn secret(db: &Database, key: SecretKey) -> String {
        db.get_secret(key).unwrap().unwrap().value
    }

    #[test]
    fn test_empty_store_is_uninitialized() {
        let (db, _temp) = setup_db();
        assert!(!manager(&db).is_initialized().unwrap());
    }

    #[test]
    fn test_initialize_generates_all_secrets() {
        let (db, _temp) = setup_db();
        let setup = manager(&db);

        let outcome = setup.initialize(None).unwrap();
        let InitOutcome::Initialized {
            generated_password: Some(password),
        } = outcome
        else {
            panic!("expected a generated password, got {outcome:?}");
        };

        assert!(setup.is_initialized().unwrap());
        assert_eq!(password.len(), GENERATED_PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(secret(&db, SecretKey::AdminSecret), password);
        assert_eq!(secret(&db, SecretKey::SigningKey).len(), 64);
        assert_eq!(secret(&db, SecretKey::ApiToken).len(), 64);
        assert_ne!(
            secret(&db, SecretKey::SigningKey),
            secret(&db, SecretKey::ApiToken)
        );
    }

    #[test]
    fn test_initialize_with_supplied_password() {
        let (db, _temp) = setup_db();
        let setup = manager(&db);

        let outcome = setup.initialize(Some("supplied-pw")).unwrap();
        assert_eq!(
            outcome,
            InitOutcome::Initialized {
                generated_password: None
            }
        );
        assert_eq!(secret(&db, SecretKey::AdminSecret), "supplied-pw");
    }

    #[test]
    fn test_initialize_rejects_short_password() {
        let (db, _temp) = setup_db();
        let setup = manager(&db);

        assert!(matches!(
            setup.initialize(Some("short")),
            Err(AuthError::Validation(_))
        ));
        assert!(!setup.is_initialized().unwrap());
        assert_eq!(db.count_secrets().unwrap(), 0);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (db, _temp) = setup_db();
        let setup = manager(&db);

        setup.initialize(Some("first-password")).unwrap();
        let signing_key = secret(&db, SecretKey::SigningKey);
        let api_token = secret(&db, SecretKey::ApiToken);

        assert_eq!(
            setup.initialize(Some("second-password")).unwrap(),
            InitOutcome::AlreadyInitialized
        );
        assert_eq!(secret(&db, SecretKey::SigningKey), signing_key);
        assert_eq!(secret(&db, SecretKey::ApiToken), api_token);
        assert_eq!(secret(&db, SecretKey::AdminSecret), "first-password");
    }

    #[test]
    fn test_partial_store_counts_as_initialized() {
        let (db, _temp) = setup_db();
        db.put_secret(SecretKey::ApiToken, "left-over").unwrap();
        let setup = manager(&db);

        assert!(setup.is_initialized().unwrap());
        assert_eq!(
            setup.initialize(None).unwrap(),
            InitOutcome::AlreadyInitialized
        );
        assert!(db.get_secret(SecretKey::SigningKey).unwrap().is_none());
    }

    #[test]
    fn test_concurrent_initialize_writes_once() {
        let (db, _temp) = setup_db();
        let setup = Arc::new(manager(&db));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let setup = Arc::clone(&setup);
                std::thread::spawn(move || setup.initialize(None).unwrap())
            })
            .collect();
        let outcomes: Vec<InitOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let initialized = outcomes
            .iter()
            .filter(|o| matches!(o, InitOutcome::Initialized { .. }))
            .count();
        assert_eq!(initialized, 1);
        assert_eq!(db.count_secrets().unwrap(), 3);
    }

    #[test]
    fn test_update_password() {
        let (db, _temp) = setup_db();
        let setup = manager(&db);
        setup.initialize(Some("first-password")).unwrap();

        assert!(matches!(
            setup.update_password("1234567"),
            Err(AuthError::Validation(_))
        ));
        assert_eq!(secret(&db, SecretKey::AdminSecret), "first-password");

        setup.update_password("12345678").unwrap();
        assert_eq!(secret(&db, SecretKey::AdminSecret), "12345678");
    }

    #[test]
    fn test_regenerate_key_touches_only_that_key() {
        let (db, _temp) = setup_db();
        let setup = manager(&db);
        setup.initialize(Some("first-password")).unwrap();
        let signing_key = secret(&db, SecretKey::SigningKey);
        let api_token = secret(&db, SecretKey::ApiToken);

        let new_token = setup.regenerate_key(SecretKey::ApiToken).unwrap();

        assert_ne!(new_token, api_token);
        assert_eq!(secret(&db, SecretKey::ApiToken), new_token);
        assert_eq!(secret(&db, SecretKey::SigningKey), signing_key);
        assert_eq!(secret(&db, SecretKey::AdminSecret), "first-password");
    }

    #[test]
    fn test_store_failure_propagates() {
        let cache = Arc::new(ConfigCache::new(
            Arc::new(FailingStore),
            Duration::minutes(5),
            Arc::new(ManualClock::default()),
        ));
        let setup = InitializationManager::new(cache, 8);

        assert!(matches!(
            setup.is_initialized(),
            Err(AuthError::StoreUnavailable(_))
        ));
        assert!(matches!(
            setup.initialize(None),
            Err(AuthError::StoreUnavailable(_))
        ));
    }
}
