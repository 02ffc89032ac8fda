//! Read-only views over the journal.

use tracing::warn;

use benchvault_core::{BackupId, BackupRecord, BackupStatistics, ListFilter};

use super::BackupService;
use crate::error::{BackupError, BackupResult};

impl BackupService {
    /// Journaled backups matching `filter`, newest first.
    pub async fn list_backups(&self, filter: &ListFilter) -> BackupResult<Vec<BackupRecord>> {
        let journal = self.journal.load().await?;
        Ok(filter.apply(&journal.backups))
    }

    /// One record by id.
    ///
    /// A record whose artifact has been removed from disk is still returned;
    /// the missing file is only logged.
    pub async fn get_backup(&self, id: BackupId) -> BackupResult<BackupRecord> {
        let journal = self.journal.load().await?;
        let record = journal
            .find(id)
            .cloned()
            .ok_or_else(|| BackupError::not_found(id))?;

        if !tokio::fs::try_exists(&record.filepath).await.unwrap_or(false) {
            warn!(
                backup_id = %id,
                path = %record.filepath.display(),
                "backup file not found on disk"
            );
        }
        Ok(record)
    }

    /// Totals across every journaled backup.
    pub async fn get_statistics(&self) -> BackupResult<BackupStatistics> {
        let journal = self.journal.load().await?;
        Ok(BackupStatistics::from_records(&journal.backups))
    }
}
