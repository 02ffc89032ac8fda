//! Configuration loading and representation.
//!
//! Everything is read once at process start from environment variables (see
//! [`BackupConfig::from_env`]); tests build configs with the `with_*` methods.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

/// Name of the journal file inside the backup directory.
pub const JOURNAL_FILE_NAME: &str = "backups_metadata.json";

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: `{value}` ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Connection parameters for the database being backed up.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
}

impl ConnectionParams {
    /// Configured password, if any non-blank one was set.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.trim().is_empty())
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: None,
            database: "FZ".to_string(),
        }
    }
}

// Never print the password.
impl core::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password().map(|_| "<redacted>"))
            .field("database", &self.database)
            .finish()
    }
}

/// Backup subsystem configuration.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub connection: ConnectionParams,
    /// Directory holding artifacts and the journal file.
    pub backup_dir: PathBuf,
    /// Upper bound for a single external tool invocation.
    pub tool_timeout: Duration,
    /// Fixed timezone the schedule's times of day are interpreted in.
    pub timezone: FixedOffset,
    /// Explicit dump utility path, skipping the probe list.
    pub dump_tool: Option<PathBuf>,
    /// Explicit client utility path, skipping the probe list.
    pub client_tool: Option<PathBuf>,
    /// Connection URL for the MySQL-backed settings store.
    pub database_url: Option<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionParams::default(),
            backup_dir: PathBuf::from("backups").join("database"),
            tool_timeout: Duration::from_secs(600),
            timezone: default_timezone(),
            dump_tool: None,
            client_tool: None,
            database_url: None,
        }
    }
}

// UTC+02:00
fn default_timezone() -> FixedOffset {
    FixedOffset::east_opt(2 * 3600).unwrap_or_else(|| Utc.fix())
}

impl BackupConfig {
    /// Load from process environment variables.
    ///
    /// | variable | default |
    /// |---|---|
    /// | `DB_HOST` | `localhost` |
    /// | `DB_PORT` | `3306` |
    /// | `DB_USER` | `root` |
    /// | `DB_PASSWORD` | empty |
    /// | `DB_NAME` | `FZ` |
    /// | `BACKUP_DIR` | `backups/database` |
    /// | `BACKUP_TOOL_TIMEOUT_SECS` | `600` |
    /// | `BACKUP_TZ_OFFSET` | `+02:00` |
    /// | `MYSQLDUMP_PATH`, `MYSQL_PATH` | probe list |
    /// | `DATABASE_URL` | unset |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (used by [`Self::from_env`] and tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("DB_PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid("DB_PORT", &v, e.to_string()))?,
            None => defaults.connection.port,
        };

        let tool_timeout = match get("BACKUP_TOOL_TIMEOUT_SECS") {
            Some(v) => match v.trim().parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::invalid(
                        "BACKUP_TOOL_TIMEOUT_SECS",
                        &v,
                        "must be at least 1",
                    ));
                }
                Ok(secs) => Duration::from_secs(secs),
                Err(e) => {
                    return Err(ConfigError::invalid(
                        "BACKUP_TOOL_TIMEOUT_SECS",
                        &v,
                        e.to_string(),
                    ));
                }
            },
            None => defaults.tool_timeout,
        };

        let timezone = match get("BACKUP_TZ_OFFSET") {
            Some(v) => parse_offset(&v)
                .ok_or_else(|| ConfigError::invalid("BACKUP_TZ_OFFSET", &v, "expected ±HH:MM"))?,
            None => defaults.timezone,
        };

        Ok(Self {
            connection: ConnectionParams {
                host: get("DB_HOST").unwrap_or(defaults.connection.host),
                port,
                user: get("DB_USER").unwrap_or(defaults.connection.user),
                password: lookup("DB_PASSWORD"),
                database: get("DB_NAME").unwrap_or(defaults.connection.database),
            },
            backup_dir: get("BACKUP_DIR").map(PathBuf::from).unwrap_or(defaults.backup_dir),
            tool_timeout,
            timezone,
            dump_tool: get("MYSQLDUMP_PATH").map(PathBuf::from),
            client_tool: get("MYSQL_PATH").map(PathBuf::from),
            database_url: get("DATABASE_URL"),
        })
    }

    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.connection.database = database.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.connection.password = Some(password.into());
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_dump_tool(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_tool = Some(path.into());
        self
    }

    pub fn with_client_tool(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_tool = Some(path.into());
        self
    }

    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn journal_path(&self) -> PathBuf {
        self.backup_dir.join(JOURNAL_FILE_NAME)
    }

    pub fn artifact_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.backup_dir.join(file_name)
    }
}

/// Parse `+HH:MM` / `-HH:MM` (also `Z` and `UTC`).
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (h, m) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = h.parse().ok()?;
    let minutes: i32 = m.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = BackupConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.connection.port, 3306);
        assert_eq!(config.connection.user, "root");
        assert_eq!(config.connection.database, "FZ");
        assert!(config.connection.password().is_none());
        assert_eq!(config.tool_timeout, Duration::from_secs(600));
        assert_eq!(config.timezone.local_minus_utc(), 7200);
        assert!(config.journal_path().ends_with("backups/database/backups_metadata.json"));
    }

    #[test]
    fn overrides_are_read() {
        let config = BackupConfig::from_lookup(lookup(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "3307"),
            ("DB_PASSWORD", "hunter2"),
            ("DB_NAME", "shop"),
            ("BACKUP_DIR", "/var/backups/shop"),
            ("BACKUP_TOOL_TIMEOUT_SECS", "30"),
            ("BACKUP_TZ_OFFSET", "-05:30"),
            ("MYSQLDUMP_PATH", "/opt/mysql/bin/mysqldump"),
        ]))
        .unwrap();

        assert_eq!(config.connection.host, "db.internal");
        assert_eq!(config.connection.port, 3307);
        assert_eq!(config.connection.password(), Some("hunter2"));
        assert_eq!(config.connection.database, "shop");
        assert_eq!(config.backup_dir, PathBuf::from("/var/backups/shop"));
        assert_eq!(config.tool_timeout, Duration::from_secs(30));
        assert_eq!(config.timezone.local_minus_utc(), -(5 * 3600 + 30 * 60));
        assert_eq!(config.dump_tool, Some(PathBuf::from("/opt/mysql/bin/mysqldump")));
        assert!(config.client_tool.is_none());
    }

    #[test]
    fn blank_password_counts_as_none() {
        let config = BackupConfig::from_lookup(lookup(&[("DB_PASSWORD", "   ")])).unwrap();
        assert!(config.connection.password().is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(BackupConfig::from_lookup(lookup(&[("DB_PORT", "http")])).is_err());
        assert!(BackupConfig::from_lookup(lookup(&[("BACKUP_TOOL_TIMEOUT_SECS", "0")])).is_err());
        assert!(BackupConfig::from_lookup(lookup(&[("BACKUP_TZ_OFFSET", "Cairo")])).is_err());
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = BackupConfig::default().with_password("hunter2");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
