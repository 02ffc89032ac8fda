//! Infrastructure layer: configuration, external tools, journal, engines,
//! settings stores and the scheduler.

pub mod backup;
pub mod config;
pub mod error;
pub mod journal;
pub mod scheduler;
pub mod settings;
pub mod tools;

pub use backup::{BackupRunner, BackupService};
pub use config::{BackupConfig, ConfigError, ConnectionParams};
pub use error::{BackupError, BackupResult};
pub use journal::{JournalError, JournalHandle};
pub use scheduler::{AutoBackupScheduler, TestBackupReport};
pub use settings::{InMemorySettingsStore, SettingsError, SettingsStore};
