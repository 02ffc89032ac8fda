//! Backup records, restoration events and the journal document that holds them.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::BackupId;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Human-readable size with two decimals, e.g. `"1.50"` for 1.5 MiB.
pub fn format_size_mb(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / BYTES_PER_MB)
}

/// Whether a dump covers the whole database or a table subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    Full,
    Partial,
}

impl BackupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupKind::Full => "full",
            BackupKind::Partial => "partial",
        }
    }
}

impl core::fmt::Display for BackupKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for BackupKind {
    type Err = crate::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(BackupKind::Full),
            "partial" => Ok(BackupKind::Partial),
            other => Err(crate::DomainError::validation(format!(
                "backup type must be `full` or `partial`, got `{other}`"
            ))),
        }
    }
}

/// One successful dump.
///
/// The record stays valid even when `filepath` no longer exists on disk;
/// the journal, not the filesystem, is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub id: BackupId,
    /// Display name: the caller's original text, not the sanitized filename.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub filename: String,
    pub filepath: PathBuf,
    /// Artifact size in bytes (post-compression when compressed).
    pub size: u64,
    #[serde(rename = "sizeMB")]
    pub size_mb: String,
    pub compressed: bool,
    pub database: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(rename = "type")]
    pub kind: BackupKind,
}

impl BackupRecord {
    /// Age relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// True when the record was captured strictly before `cutoff`.
    pub fn is_older_than(&self, cutoff: DateTime<Utc>) -> bool {
        self.created_at < cutoff
    }
}

/// Audit entry written after a restore applied a dump. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationEvent {
    pub backup_id: BackupId,
    pub restored_at: DateTime<Utc>,
    #[serde(default)]
    pub restored_by: Option<String>,
}

impl RestorationEvent {
    pub fn new(backup_id: BackupId, restored_by: Option<String>) -> Self {
        Self {
            backup_id,
            restored_at: Utc::now(),
            restored_by,
        }
    }
}

/// The full journal document: `{ "backups": [...], "restorations": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupJournal {
    #[serde(default)]
    pub backups: Vec<BackupRecord>,
    #[serde(default)]
    pub restorations: Vec<RestorationEvent>,
}

impl BackupJournal {
    pub fn find(&self, id: BackupId) -> Option<&BackupRecord> {
        self.backups.iter().find(|b| b.id == id)
    }

    /// Remove every record with `id`, returning the first one removed.
    pub fn remove(&mut self, id: BackupId) -> Option<BackupRecord> {
        let position = self.backups.iter().position(|b| b.id == id)?;
        let removed = self.backups.remove(position);
        self.backups.retain(|b| b.id != id);
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> BackupRecord {
        BackupRecord {
            id: BackupId::new(),
            name: name.to_string(),
            description: None,
            filename: format!("{name}.sql.gz"),
            filepath: PathBuf::from(format!("/tmp/{name}.sql.gz")),
            size: 1_572_864,
            size_mb: format_size_mb(1_572_864),
            compressed: true,
            database: "shop".to_string(),
            created_at: Utc::now(),
            created_by: None,
            kind: BackupKind::Full,
        }
    }

    #[test]
    fn size_mb_has_two_decimals() {
        assert_eq!(format_size_mb(0), "0.00");
        assert_eq!(format_size_mb(1_572_864), "1.50");
        assert_eq!(format_size_mb(1), "0.00");
    }

    #[test]
    fn record_serializes_with_wire_field_names() {
        let json = serde_json::to_value(record("nightly")).unwrap();
        assert_eq!(json["sizeMB"], "1.50");
        assert_eq!(json["type"], "full");
        assert!(json["createdAt"].is_string());
        assert!(json["createdBy"].is_null());
    }

    #[test]
    fn journal_tolerates_missing_sections() {
        let journal: BackupJournal = serde_json::from_str(r#"{"backups": []}"#).unwrap();
        assert!(journal.restorations.is_empty());

        let journal: BackupJournal = serde_json::from_str("{}").unwrap();
        assert!(journal.backups.is_empty());
    }

    #[test]
    fn remove_returns_record_once() {
        let mut journal = BackupJournal::default();
        let r = record("a");
        let id = r.id;
        journal.backups.push(r);
        journal.backups.push(record("b"));

        assert_eq!(journal.remove(id).map(|r| r.name), Some("a".to_string()));
        assert!(journal.remove(id).is_none());
        assert_eq!(journal.backups.len(), 1);
    }
}
