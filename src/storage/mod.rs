pub mod db;
pub mod models;
mod secrets;
mod tables;

pub use db::{Database, DatabaseError};
pub use models::{SecretKey, SecretRecord};
pub use tables::*;

/// Durable key/value store for the gate's secrets.
///
/// Upserts are atomic per call. An error means the store could not be
/// reached or read; a missing secret is `Ok(None)`.
pub trait SecretStore: Send + Sync {
    fn get(&self, key: SecretKey) -> Result<Option<SecretRecord>, DatabaseError>;

    fn upsert(&self, key: SecretKey, value: &str) -> Result<(), DatabaseError>;

    /// Write every entry or none of them
    fn upsert_all(&self, entries: &[(SecretKey, String)]) -> Result<(), DatabaseError>;

    fn count(&self) -> Result<u64, DatabaseError>;
}
