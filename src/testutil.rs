//! Shared test helpers, available to all `#[cfg(test)]` modules in the crate.

use std::sync::Arc;

use tempfile::TempDir;

use crate::clock::ManualClock;
use crate::config::{AuthConfig, Config, NodeConfig};
use crate::gate::GateConfig;
use crate::storage::models::{SecretKey, SecretRecord};
use crate::storage::{Database, DatabaseError, SecretStore};
use crate::AppState;

/// Open a fresh database in a temporary directory.
///
/// Returns both the `Database` and the `TempDir` guard. The caller must
/// keep the `TempDir` alive for the duration of the test.
pub fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path()).unwrap();
    (db, temp_dir)
}

/// Write a known set of secrets so the system counts as initialized.
pub fn seed_secrets(db: &Database) {
    db.put_secrets(&[
        (
            SecretKey::SigningKey,
            "0123456789abcdef0123456789abcdef".to_string(),
        ),
        (SecretKey::ApiToken, "test-api-token".to_string()),
        (SecretKey::AdminSecret, "correct-horse".to_string()),
    ])
    .unwrap();
}

/// A store whose every operation fails, for exercising outage paths.
pub struct FailingStore;

fn unavailable() -> DatabaseError {
    DatabaseError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "store offline",
    ))
}

impl SecretStore for FailingStore {
    fn get(&self, _key: SecretKey) -> Result<Option<SecretRecord>, DatabaseError> {
        Err(unavailable())
    }

    fn upsert(&self, _key: SecretKey, _value: &str) -> Result<(), DatabaseError> {
        Err(unavailable())
    }

    fn upsert_all(&self, _entries: &[(SecretKey, String)]) -> Result<(), DatabaseError> {
        Err(unavailable())
    }

    fn count(&self) -> Result<u64, DatabaseError> {
        Err(unavailable())
    }
}

/// A minimal `Config` suitable for unit tests.
pub fn test_config() -> Config {
    Config {
        auth: AuthConfig::default(),
        gate: GateConfig::default(),
        node: NodeConfig {
            bind_address: "127.0.0.1:8080".to_string(),
            data_dir: "/tmp/test".to_string(),
        },
        upstream_url: None,
    }
}

/// Build a full `Arc<AppState>` around the given database and clock.
pub fn test_state(db: Database, clock: Arc<ManualClock>) -> Arc<AppState> {
    Arc::new(AppState::new(test_config(), Arc::new(db), clock))
}
