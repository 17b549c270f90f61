use chrono::Duration;
use std::sync::Arc;

use super::TtlCache;
use crate::clock::Clock;
use crate::storage::{DatabaseError, SecretKey, SecretStore};

/// Read-through cache of secret values in front of the [`SecretStore`].
///
/// Missing secrets are not cached, so a secret written later by another
/// process is picked up on the next lookup. A secret *changed* by another
/// process stays stale here for up to the TTL.
pub struct ConfigCache {
    entries: TtlCache<String>,
    store: Arc<dyn SecretStore>,
}

impl ConfigCache {
    pub fn new(store: Arc<dyn SecretStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: TtlCache::new(ttl, clock),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }

    /// Resolve a secret, hitting the store only when no fresh entry exists
    pub fn resolve(&self, key: SecretKey) -> Result<Option<String>, DatabaseError> {
        if let Some(value) = self.entries.get(key.as_str()) {
            return Ok(Some(value));
        }

        match self.store.get(key)? {
            Some(record) => {
                tracing::debug!(key = %key, "Secret loaded from store");
                self.entries.insert(key.as_str(), record.value.clone());
                Ok(Some(record.value))
            }
            None => Ok(None),
        }
    }

    /// Forget a cached secret so the next lookup reads the store
    pub fn invalidate(&self, key: SecretKey) {
        self.entries.remove(key.as_str());
    }
}
