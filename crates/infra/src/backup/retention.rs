//! Deletion and age-based retention.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use benchvault_core::{BackupId, CleanupReport};

use super::BackupService;
use crate::error::{BackupError, BackupResult};

impl BackupService {
    /// Remove a backup's artifact (best effort) and its journal record.
    ///
    /// The record is removed even when the file is already gone.
    #[instrument(skip(self), fields(backup_id = %id))]
    pub async fn delete_backup(&self, id: BackupId) -> BackupResult<()> {
        let journal = self.journal.load().await?;
        let record = journal.find(id).ok_or_else(|| BackupError::not_found(id))?;

        match tokio::fs::remove_file(&record.filepath).await {
            Ok(()) => info!(path = %record.filepath.display(), "backup file deleted"),
            Err(e) => warn!(
                path = %record.filepath.display(),
                error = %e,
                "backup file not found or could not be deleted"
            ),
        }

        // A concurrent delete may have won the race.
        let removed = self
            .journal
            .remove_backup(id)
            .await?
            .ok_or_else(|| BackupError::not_found(id))?;

        info!(backup = %removed.name, "backup deleted");
        Ok(())
    }

    /// Delete every backup created more than `days_to_keep` days ago.
    ///
    /// Each deletion is independent; failures are logged and counted in
    /// `total` but not in `deleted`. A horizon reaching past the earliest
    /// representable time expires nothing.
    #[instrument(skip(self))]
    pub async fn cleanup_old_backups(&self, days_to_keep: u32) -> BackupResult<CleanupReport> {
        let Some(cutoff) = retention_cutoff(Utc::now(), days_to_keep) else {
            warn!(days_to_keep, "retention horizon out of range; nothing to clean up");
            return Ok(CleanupReport::default());
        };
        let journal = self.journal.load().await?;
        let expired: Vec<BackupId> = journal
            .backups
            .iter()
            .filter(|b| b.is_older_than(cutoff))
            .map(|b| b.id)
            .collect();

        let mut report = CleanupReport {
            deleted: 0,
            total: expired.len(),
        };
        for id in expired {
            match self.delete_backup(id).await {
                Ok(()) => report.deleted += 1,
                Err(e) => warn!(backup_id = %id, error = %e, "could not delete expired backup"),
            }
        }

        info!(deleted = report.deleted, total = report.total, "old backups cleaned up");
        Ok(report)
    }
}

/// `now - days`, or `None` when that instant is not representable.
fn retention_cutoff(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    Duration::try_days(i64::from(days)).and_then(|horizon| now.checked_sub_signed(horizon))
}
