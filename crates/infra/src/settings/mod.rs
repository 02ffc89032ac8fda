//! Persistent key/value settings used by the scheduler.
//!
//! Values are stored as strings under the `auto_backup.*` keys; parsing and
//! defaults live in `benchvault_core::ScheduleSettings`.

#[cfg(feature = "mysql")]
mod mysql;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

#[cfg(feature = "mysql")]
pub use mysql::MySqlSettingsStore;

/// Settings store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("settings storage error: {0}")]
    Storage(String),
}

/// Key/value settings persistence.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Stored value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;

    /// Insert or overwrite `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// In-memory settings store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Seed with initial values.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let values = self
            .values
            .read()
            .map_err(|_| SettingsError::Storage("settings lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| SettingsError::Storage("settings lock poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use benchvault_core::schedule::keys;

    use super::*;

    #[tokio::test]
    async fn in_memory_get_set() {
        let store = InMemorySettingsStore::with_values([(keys::KEEP_DAYS, "14")]);
        assert_eq!(store.get(keys::KEEP_DAYS).await.unwrap().as_deref(), Some("14"));
        assert!(store.get(keys::DAILY_TIME).await.unwrap().is_none());

        store.set(keys::DAILY_TIME, "03:15").await.unwrap();
        store.set(keys::KEEP_DAYS, "7").await.unwrap();
        assert_eq!(store.get(keys::DAILY_TIME).await.unwrap().as_deref(), Some("03:15"));
        assert_eq!(store.get(keys::KEEP_DAYS).await.unwrap().as_deref(), Some("7"));
    }
}
