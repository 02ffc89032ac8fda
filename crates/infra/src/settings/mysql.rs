//! MySQL-backed settings store.
//!
//! Reads and writes rows of the application's `SystemSetting` table. New keys
//! are inserted as `type = 'string'`, `category = 'system'`.

use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySqlPool, Row};
use tracing::debug;

use super::{SettingsError, SettingsStore};

/// Settings store over an existing MySQL pool.
#[derive(Debug, Clone)]
pub struct MySqlSettingsStore {
    pool: MySqlPool,
}

impl MySqlSettingsStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Connect a small pool to `url`.
    pub async fn connect(url: &str) -> Result<Self, SettingsError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .connect(url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }
}

fn map_sqlx_error(err: sqlx::Error) -> SettingsError {
    SettingsError::Storage(err.to_string())
}

#[async_trait]
impl SettingsStore for MySqlSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let row = sqlx::query("SELECT value FROM SystemSetting WHERE `key` = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => row
                .try_get::<Option<String>, _>("value")
                .map_err(map_sqlx_error),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let exists = sqlx::query("SELECT 1 FROM SystemSetting WHERE `key` = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        if exists {
            sqlx::query("UPDATE SystemSetting SET value = ? WHERE `key` = ?")
                .bind(value)
                .bind(key)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO SystemSetting (`key`, value, type, category, description)
                VALUES (?, ?, 'string', 'system', ?)
                "#,
            )
            .bind(key)
            .bind(value)
            .bind(format!("Auto backup setting: {key}"))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        }

        debug!(key, "setting persisted");
        Ok(())
    }
}
