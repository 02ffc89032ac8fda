//! On-disk journal document.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use benchvault_core::BackupJournal;

use super::JournalError;

/// The journal file at a fixed path.
#[derive(Debug, Clone)]
pub struct JournalFile {
    path: PathBuf,
}

impl JournalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document.
    ///
    /// A missing file is an empty journal. An unreadable or corrupt file is
    /// also treated as empty, with a warning. A corrupt file is first moved
    /// aside to `<name>.corrupt` so the next persist cannot destroy it.
    pub async fn load(&self) -> BackupJournal {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BackupJournal::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "journal unreadable; treating as empty");
                return BackupJournal::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(journal) => journal,
            Err(e) => {
                let quarantine = self.quarantine_path();
                match tokio::fs::rename(&self.path, &quarantine).await {
                    Ok(()) => warn!(
                        path = %self.path.display(),
                        moved_to = %quarantine.display(),
                        error = %e,
                        "journal corrupt; moved aside and treating as empty"
                    ),
                    Err(rename) => warn!(
                        path = %self.path.display(),
                        error = %e,
                        rename_error = %rename,
                        "journal corrupt and could not be moved aside; treating as empty"
                    ),
                }
                BackupJournal::default()
            }
        }
    }

    /// Where a journal that fails to parse is kept.
    pub fn quarantine_path(&self) -> PathBuf {
        let mut path = self.path.as_os_str().to_owned();
        path.push(".corrupt");
        PathBuf::from(path)
    }

    /// Replace the document atomically: write a temp file, fsync, rename.
    pub async fn persist(&self, journal: &BackupJournal) -> Result<(), JournalError> {
        let bytes = serde_json::to_vec_pretty(journal)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_replace(&path, &bytes))
            .await
            .map_err(|e| JournalError::Io(std::io::Error::other(e)))??;
        Ok(())
    }
}

fn write_replace(path: &Path, bytes: &[u8]) -> Result<(), JournalError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir)?;
    }

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    {
        let mut file = File::create(&temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&temp, path)?;

    if let Some(dir) = dir {
        sync_dir(dir)?;
    }
    Ok(())
}

// Make the rename durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use benchvault_core::{format_size_mb, BackupId, BackupKind, BackupRecord};
    use chrono::Utc;

    use super::*;

    fn record(name: &str) -> BackupRecord {
        BackupRecord {
            id: BackupId::new(),
            name: name.to_string(),
            description: None,
            filename: format!("{name}.sql"),
            filepath: PathBuf::from(format!("/tmp/{name}.sql")),
            size: 42,
            size_mb: format_size_mb(42),
            compressed: false,
            database: "FZ".to_string(),
            created_at: Utc::now(),
            created_by: None,
            kind: BackupKind::Full,
        }
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = JournalFile::new(dir.path().join("backups_metadata.json"));
        assert_eq!(file.load().await, BackupJournal::default());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backups_metadata.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(JournalFile::new(&path).load().await.backups.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_survives_next_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backups_metadata.json");
        let bad = r#"{ "backups": [ { "id": 1, "createdBy": 7 } ], "restorations": [] }"#;
        std::fs::write(&path, bad).unwrap();

        let file = JournalFile::new(&path);
        assert!(file.load().await.backups.is_empty());
        file.persist(&BackupJournal {
            backups: vec![record("fresh")],
            restorations: Vec::new(),
        })
        .await
        .unwrap();

        let quarantine = dir.path().join("backups_metadata.json.corrupt");
        assert_eq!(file.quarantine_path(), quarantine);
        assert_eq!(std::fs::read_to_string(&quarantine).unwrap(), bad);
        assert_eq!(file.load().await.backups.len(), 1);
    }

    #[tokio::test]
    async fn persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = JournalFile::new(dir.path().join("nested").join("backups_metadata.json"));

        let journal = BackupJournal {
            backups: vec![record("a"), record("b")],
            restorations: Vec::new(),
        };
        file.persist(&journal).await.unwrap();

        assert_eq!(file.load().await, journal);
        assert!(!dir.path().join("nested").join("backups_metadata.json.tmp").exists());

        let raw = std::fs::read_to_string(file.path()).unwrap();
        assert!(raw.contains("\"backups\""));
        assert!(raw.contains("\"restorations\""));
        assert!(raw.contains("\"sizeMB\""));
    }
}
