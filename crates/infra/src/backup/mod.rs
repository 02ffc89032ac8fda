//! Backup and restore engines.
//!
//! ## Components
//!
//! - `create`: dump → optional gzip → journal append
//! - `restore`: decompress → optional drop/create → apply → audit event
//! - `catalog`: list/get/statistics over the journal
//! - `retention`: delete and age-based cleanup
//!
//! All engine operations hang off [`BackupService`], which owns the
//! configuration and a handle to the journal task.

mod catalog;
mod compress;
mod create;
mod restore;
mod retention;

use std::sync::Arc;

use async_trait::async_trait;

use benchvault_core::{BackupOptions, BackupRecord, CleanupReport};

use crate::config::BackupConfig;
use crate::error::BackupResult;
use crate::journal::JournalHandle;

/// The operations the scheduler needs from the engines.
///
/// Implemented by [`BackupService`]; tests substitute a fake.
#[async_trait]
pub trait BackupRunner: Send + Sync {
    async fn create_backup(&self, options: BackupOptions) -> BackupResult<BackupRecord>;

    async fn cleanup_old_backups(&self, days_to_keep: u32) -> BackupResult<CleanupReport>;
}

/// Backup/restore service over one database.
#[derive(Debug, Clone)]
pub struct BackupService {
    config: Arc<BackupConfig>,
    journal: JournalHandle,
}

impl BackupService {
    pub fn new(config: BackupConfig, journal: JournalHandle) -> Self {
        Self {
            config: Arc::new(config),
            journal,
        }
    }

    /// Build a service whose journal lives in the configured backup directory.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(config: BackupConfig) -> Self {
        let journal = JournalHandle::spawn(config.journal_path());
        Self::new(config, journal)
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    pub fn journal(&self) -> &JournalHandle {
        &self.journal
    }
}

#[async_trait]
impl BackupRunner for BackupService {
    async fn create_backup(&self, options: BackupOptions) -> BackupResult<BackupRecord> {
        BackupService::create_backup(self, options).await
    }

    async fn cleanup_old_backups(&self, days_to_keep: u32) -> BackupResult<CleanupReport> {
        BackupService::cleanup_old_backups(self, days_to_keep).await
    }
}
