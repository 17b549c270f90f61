use chrono::Utc;
use redb::{ReadableTable, ReadableTableMetadata, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{SecretKey, SecretRecord};
use super::tables::*;
use super::SecretStore;

impl Database {
    // ========================================================================
    // Secret operations
    // ========================================================================

    /// Get a secret by key
    pub fn get_secret(&self, key: SecretKey) -> Result<Option<SecretRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SECRETS)?;

        match table.get(key.as_str())? {
            Some(data) => {
                let record: SecretRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace a single secret
    pub fn put_secret(&self, key: SecretKey, value: &str) -> Result<(), DatabaseError> {
        self.put_secrets(&[(key, value.to_string())])
    }

    /// Insert or replace several secrets in one transaction
    pub fn put_secrets(&self, entries: &[(SecretKey, String)]) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        for (key, value) in entries {
            write_secret(&write_txn, *key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Number of stored secrets
    pub fn count_secrets(&self) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SECRETS)?;
        Ok(table.len()?)
    }
}

fn write_secret(
    write_txn: &WriteTransaction,
    key: SecretKey,
    value: &str,
) -> Result<(), DatabaseError> {
    debug_assert!(!value.is_empty(), "secret value must not be empty");

    let record = SecretRecord {
        key,
        updated_at: Utc::now(),
        value: value.to_string(),
    };

    let mut table = write_txn.open_table(SECRETS)?;
    let data = rmp_serde::to_vec_named(&record)?;
    table.insert(key.as_str(), data.as_slice())?;
    Ok(())
}

impl SecretStore for Database {
    fn get(&self, key: SecretKey) -> Result<Option<SecretRecord>, DatabaseError> {
        self.get_secret(key)
    }

    fn upsert(&self, key: SecretKey, value: &str) -> Result<(), DatabaseError> {
        self.put_secret(key, value)
    }

    fn upsert_all(&self, entries: &[(SecretKey, String)]) -> Result<(), DatabaseError> {
        self.put_secrets(entries)
    }

    fn count(&self) -> Result<u64, DatabaseError> {
        self.count_secrets()
    }
}
