//! `benchvault-core`: domain building blocks for the backup subsystem.
//!
//! This crate contains **pure domain** types (no process execution, no I/O):
//! backup records, restoration events, option/report types, schedule settings
//! and the artifact naming rules.

pub mod error;
pub mod id;
pub mod naming;
pub mod options;
pub mod record;
pub mod schedule;

pub use error::{DomainError, DomainResult};
pub use id::BackupId;
pub use naming::{artifact_stem, default_backup_name, sanitize_backup_name, MAX_NAME_LEN};
pub use options::{
    BackupOptions, BackupStatistics, CleanupReport, ListFilter, RestoreOptions, RestoreOutcome,
};
pub use record::{format_size_mb, BackupJournal, BackupKind, BackupRecord, RestorationEvent};
pub use schedule::{
    weekday_name, ScheduleSettings, ScheduleSlot, SettingsSnapshot, SettingsUpdate, TimeOfDay,
    MAX_KEEP_DAYS,
};
