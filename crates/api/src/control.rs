//! The backup control surface: one method per externally exposed operation.
//!
//! Transport framing (HTTP routes, auth) sits outside this crate; this layer
//! parses raw identifiers, applies defaults and maps errors.

use std::sync::Arc;

use tracing::info;

use benchvault_core::{
    BackupId, BackupOptions, BackupRecord, BackupStatistics, CleanupReport, ListFilter,
    RestoreOptions, RestoreOutcome, ScheduleSlot, SettingsSnapshot, SettingsUpdate,
};
use benchvault_infra::{AutoBackupScheduler, BackupService, TestBackupReport};

use crate::errors::{ControlError, ControlResult};

/// Retention horizon used when a cleanup request names none.
pub const DEFAULT_KEEP_DAYS: u32 = 30;

/// Facade over the backup service and the scheduler.
#[derive(Debug, Clone)]
pub struct BackupControl {
    service: BackupService,
    scheduler: Arc<AutoBackupScheduler>,
}

fn parse_id(raw: &str) -> ControlResult<BackupId> {
    raw.trim()
        .parse()
        .map_err(|_| ControlError::not_found(format!("backup not found: {raw}")))
}

impl BackupControl {
    pub fn new(service: BackupService, scheduler: Arc<AutoBackupScheduler>) -> Self {
        Self { service, scheduler }
    }

    pub fn service(&self) -> &BackupService {
        &self.service
    }

    pub fn scheduler(&self) -> &Arc<AutoBackupScheduler> {
        &self.scheduler
    }

    /// Load persisted schedule settings and start any enabled slots.
    pub async fn init_scheduler(&self) -> ControlResult<SettingsSnapshot> {
        Ok(self.scheduler.init().await?)
    }

    pub async fn get_settings(&self) -> SettingsSnapshot {
        self.scheduler.settings().await
    }

    pub async fn update_settings(&self, update: SettingsUpdate) -> ControlResult<SettingsSnapshot> {
        Ok(self.scheduler.update_settings(update).await?)
    }

    pub async fn start_scheduler(&self) -> ControlResult<SettingsSnapshot> {
        self.scheduler.start().await?;
        Ok(self.scheduler.settings().await)
    }

    pub async fn stop_scheduler(&self) -> SettingsSnapshot {
        self.scheduler.stop().await;
        self.scheduler.settings().await
    }

    /// Run the `daily` or `weekly` firing now.
    pub async fn test_backup(&self, kind: &str) -> ControlResult<TestBackupReport> {
        let slot: ScheduleSlot = kind
            .parse()
            .map_err(|e: benchvault_core::DomainError| ControlError::invalid_request(e.to_string()))?;
        Ok(self.scheduler.test_backup(slot).await)
    }

    pub async fn create_backup(&self, options: BackupOptions) -> ControlResult<BackupRecord> {
        Ok(self.service.create_backup(options).await?)
    }

    pub async fn list_backups(&self, filter: &ListFilter) -> ControlResult<Vec<BackupRecord>> {
        Ok(self.service.list_backups(filter).await?)
    }

    pub async fn get_backup(&self, id: &str) -> ControlResult<BackupRecord> {
        Ok(self.service.get_backup(parse_id(id)?).await?)
    }

    pub async fn restore_backup(
        &self,
        id: &str,
        options: RestoreOptions,
    ) -> ControlResult<RestoreOutcome> {
        let id = parse_id(id)?;
        info!(backup_id = %id, requested_by = ?options.user_id, "restore requested");
        Ok(self.service.restore_backup(id, options).await?)
    }

    pub async fn delete_backup(&self, id: &str) -> ControlResult<()> {
        Ok(self.service.delete_backup(parse_id(id)?).await?)
    }

    /// Delete backups older than `days_to_keep` (default 30).
    pub async fn cleanup_old_backups(&self, days_to_keep: Option<u32>) -> ControlResult<CleanupReport> {
        let days = days_to_keep.unwrap_or(DEFAULT_KEEP_DAYS);
        Ok(self.service.cleanup_old_backups(days).await?)
    }

    pub async fn get_statistics(&self) -> ControlResult<BackupStatistics> {
        Ok(self.service.get_statistics().await?)
    }
}
