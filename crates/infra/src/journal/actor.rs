//! Journal actor: one task owns the file, callers talk to it over a channel.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use benchvault_core::{BackupId, BackupJournal, BackupRecord, RestorationEvent};

use super::file::JournalFile;
use super::JournalError;

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, JournalError>>;

enum JournalCommand {
    Load(Reply<BackupJournal>),
    AppendBackup(BackupRecord, Reply<()>),
    AppendRestoration(RestorationEvent, Reply<()>),
    RemoveBackup(BackupId, Reply<Option<BackupRecord>>),
    Rewrite(BackupJournal, Reply<()>),
}

/// Cloneable handle to the journal task.
///
/// Commands are applied one at a time in arrival order, so two concurrent
/// appends both land in the document.
#[derive(Debug, Clone)]
pub struct JournalHandle {
    tx: mpsc::Sender<JournalCommand>,
}

impl std::fmt::Debug for JournalCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JournalCommand::Load(_) => "Load",
            JournalCommand::AppendBackup(..) => "AppendBackup",
            JournalCommand::AppendRestoration(..) => "AppendRestoration",
            JournalCommand::RemoveBackup(..) => "RemoveBackup",
            JournalCommand::Rewrite(..) => "Rewrite",
        };
        f.write_str(name)
    }
}

impl JournalHandle {
    /// Spawn the owning task on the current tokio runtime.
    ///
    /// The task exits once every handle has been dropped.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let file = JournalFile::new(path);
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        info!(path = %file.path().display(), "journal task started");
        tokio::spawn(run(file, rx));
        Self { tx }
    }

    /// The full document; empty when the file is absent or corrupt.
    pub async fn load(&self) -> Result<BackupJournal, JournalError> {
        self.request(JournalCommand::Load).await
    }

    pub async fn append_backup(&self, record: BackupRecord) -> Result<(), JournalError> {
        self.request(|reply| JournalCommand::AppendBackup(record, reply))
            .await
    }

    pub async fn append_restoration(&self, event: RestorationEvent) -> Result<(), JournalError> {
        self.request(|reply| JournalCommand::AppendRestoration(event, reply))
            .await
    }

    /// Remove the record with `id`, returning it if it existed.
    pub async fn remove_backup(&self, id: BackupId) -> Result<Option<BackupRecord>, JournalError> {
        self.request(|reply| JournalCommand::RemoveBackup(id, reply))
            .await
    }

    /// Replace the whole document.
    pub async fn rewrite(&self, journal: BackupJournal) -> Result<(), JournalError> {
        self.request(|reply| JournalCommand::Rewrite(journal, reply))
            .await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> JournalCommand,
    ) -> Result<T, JournalError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| JournalError::Closed)?;
        rx.await.map_err(|_| JournalError::Closed)?
    }
}

async fn run(file: JournalFile, mut rx: mpsc::Receiver<JournalCommand>) {
    while let Some(command) = rx.recv().await {
        debug!(command = ?command, "journal command");
        match command {
            JournalCommand::Load(reply) => {
                let _ = reply.send(Ok(file.load().await));
            }
            JournalCommand::AppendBackup(record, reply) => {
                let mut journal = file.load().await;
                journal.backups.push(record);
                let _ = reply.send(file.persist(&journal).await);
            }
            JournalCommand::AppendRestoration(event, reply) => {
                let mut journal = file.load().await;
                journal.restorations.push(event);
                let _ = reply.send(file.persist(&journal).await);
            }
            JournalCommand::RemoveBackup(id, reply) => {
                let mut journal = file.load().await;
                let result = match journal.remove(id) {
                    Some(removed) => file.persist(&journal).await.map(|()| Some(removed)),
                    None => Ok(None),
                };
                let _ = reply.send(result);
            }
            JournalCommand::Rewrite(journal, reply) => {
                let _ = reply.send(file.persist(&journal).await);
            }
        }
    }
    debug!(path = %file.path().display(), "journal task stopped");
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use benchvault_core::{format_size_mb, BackupKind};
    use chrono::Utc;

    use super::*;

    fn record(name: &str) -> BackupRecord {
        BackupRecord {
            id: BackupId::new(),
            name: name.to_string(),
            description: Some("test".to_string()),
            filename: format!("{name}.sql.gz"),
            filepath: PathBuf::from(format!("/tmp/{name}.sql.gz")),
            size: 1024,
            size_mb: format_size_mb(1024),
            compressed: true,
            database: "FZ".to_string(),
            created_at: Utc::now(),
            created_by: Some("u-1".to_string()),
            kind: BackupKind::Full,
        }
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let journal = JournalHandle::spawn(dir.path().join("backups_metadata.json"));

        let mut tasks = Vec::new();
        for i in 0..20 {
            let journal = journal.clone();
            tasks.push(tokio::spawn(async move {
                journal.append_backup(record(&format!("b{i}"))).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(journal.load().await.unwrap().backups.len(), 20);
    }

    #[tokio::test]
    async fn remove_returns_record_once() {
        let dir = tempfile::tempdir().unwrap();
        let journal = JournalHandle::spawn(dir.path().join("backups_metadata.json"));
        let rec = record("gone");
        let id = rec.id;
        journal.append_backup(rec).await.unwrap();
        journal.append_backup(record("kept")).await.unwrap();

        assert_eq!(journal.remove_backup(id).await.unwrap().unwrap().name, "gone");
        assert!(journal.remove_backup(id).await.unwrap().is_none());

        let doc = journal.load().await.unwrap();
        assert_eq!(doc.backups.len(), 1);
        assert_eq!(doc.backups[0].name, "kept");
    }

    #[tokio::test]
    async fn restorations_and_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let journal = JournalHandle::spawn(dir.path().join("backups_metadata.json"));
        let rec = record("r");
        let id = rec.id;
        journal.append_backup(rec).await.unwrap();
        journal
            .append_restoration(RestorationEvent::new(id, Some("admin".into())))
            .await
            .unwrap();

        let doc = journal.load().await.unwrap();
        assert_eq!(doc.restorations.len(), 1);
        assert_eq!(doc.restorations[0].backup_id, id);

        journal.rewrite(BackupJournal::default()).await.unwrap();
        assert_eq!(journal.load().await.unwrap(), BackupJournal::default());
    }
}
