//! Request options and reports exchanged with the backup/restore engines.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{BackupKind, BackupRecord};

/// Options for creating a backup.
///
/// If both `include_data` and `include_structure` are false the dump is still
/// attempted without either restriction flag; that is caller error and is not
/// special-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    pub compress: bool,
    pub include_data: bool,
    pub include_structure: bool,
    /// When non-empty, the dump is scoped to exactly these tables.
    pub tables: Option<Vec<String>>,
    pub user_id: Option<String>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            compress: true,
            include_data: true,
            include_structure: true,
            tables: None,
            user_id: None,
        }
    }
}

impl BackupOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = Some(tables.into_iter().map(Into::into).collect());
        self
    }

    pub fn uncompressed(mut self) -> Self {
        self.compress = false;
        self
    }

    pub fn by(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Tables to scope the dump to, if a non-empty subset was requested.
    pub fn table_scope(&self) -> Option<&[String]> {
        self.tables.as_deref().filter(|t| !t.is_empty())
    }

    pub fn kind(&self) -> BackupKind {
        if self.table_scope().is_some() {
            BackupKind::Partial
        } else {
            BackupKind::Full
        }
    }
}

/// Options for restoring a backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestoreOptions {
    pub drop_database: bool,
    pub create_database: bool,
    pub user_id: Option<String>,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            drop_database: false,
            create_database: true,
            user_id: None,
        }
    }
}

/// Result of a successful restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub success: bool,
    pub backup_name: String,
}

/// Result of a retention sweep: `deleted` of `total` eligible records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub deleted: usize,
    pub total: usize,
}

/// Filters for listing backups. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: Option<BackupKind>,
}

impl ListFilter {
    pub fn matches(&self, record: &BackupRecord) -> bool {
        self.start_date.is_none_or(|s| record.created_at >= s)
            && self.end_date.is_none_or(|e| record.created_at <= e)
            && self.kind.is_none_or(|k| record.kind == k)
    }

    /// Filter and sort newest first.
    pub fn apply<'a, I>(&self, records: I) -> Vec<BackupRecord>
    where
        I: IntoIterator<Item = &'a BackupRecord>,
    {
        let mut out: Vec<BackupRecord> = records
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}

/// Aggregate view over the journal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatistics {
    pub total: usize,
    #[serde(rename = "totalSizeMB")]
    pub total_size_mb: f64,
    pub by_type: BTreeMap<String, usize>,
    /// Keyed by `YYYY-MM`.
    pub by_month: BTreeMap<String, usize>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

impl BackupStatistics {
    pub fn from_records(records: &[BackupRecord]) -> Self {
        let total_bytes: u64 = records.iter().map(|r| r.size).sum();
        let total_size_mb = (total_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;

        let mut by_type = BTreeMap::new();
        let mut by_month = BTreeMap::new();
        for r in records {
            *by_type.entry(r.kind.as_str().to_string()).or_insert(0) += 1;
            *by_month
                .entry(r.created_at.format("%Y-%m").to_string())
                .or_insert(0) += 1;
        }

        Self {
            total: records.len(),
            total_size_mb,
            by_type,
            by_month,
            oldest: records.iter().map(|r| r.created_at).min(),
            newest: records.iter().map(|r| r.created_at).max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::TimeZone;

    use super::*;
    use crate::{format_size_mb, BackupId};

    fn record_at(at: DateTime<Utc>, kind: BackupKind, size: u64) -> BackupRecord {
        BackupRecord {
            id: BackupId::new(),
            name: "r".to_string(),
            description: None,
            filename: "r.sql".to_string(),
            filepath: PathBuf::from("/nowhere/r.sql"),
            size,
            size_mb: format_size_mb(size),
            compressed: false,
            database: "shop".to_string(),
            created_at: at,
            created_by: None,
            kind,
        }
    }

    #[test]
    fn defaults_follow_wire_contract() {
        let opts: BackupOptions = serde_json::from_str("{}").unwrap();
        assert!(opts.compress && opts.include_data && opts.include_structure);
        assert_eq!(opts.kind(), BackupKind::Full);

        let restore: RestoreOptions = serde_json::from_str(r#"{"dropDatabase": true}"#).unwrap();
        assert!(restore.drop_database);
        assert!(restore.create_database);
    }

    #[test]
    fn empty_table_list_is_a_full_backup() {
        let opts = BackupOptions::default().with_tables(Vec::<String>::new());
        assert_eq!(opts.kind(), BackupKind::Full);
        assert!(opts.table_scope().is_none());

        let opts = BackupOptions::default().with_tables(["customers"]);
        assert_eq!(opts.kind(), BackupKind::Partial);
    }

    #[test]
    fn list_filter_sorts_newest_first_and_bounds_inclusively() {
        let jan = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap();
        let mar = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let records = vec![
            record_at(feb, BackupKind::Full, 1),
            record_at(jan, BackupKind::Partial, 1),
            record_at(mar, BackupKind::Full, 1),
        ];

        let all = ListFilter::default().apply(&records);
        assert_eq!(all.iter().map(|r| r.created_at).collect::<Vec<_>>(), vec![mar, feb, jan]);

        let filter = ListFilter {
            start_date: Some(jan),
            end_date: Some(feb),
            kind: Some(BackupKind::Full),
        };
        let hits = filter.apply(&records);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].created_at, feb);
    }

    #[test]
    fn statistics_group_by_type_and_month() {
        let jan = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let jan2 = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap();
        let records = vec![
            record_at(jan, BackupKind::Full, 1024 * 1024),
            record_at(jan2, BackupKind::Partial, 512 * 1024),
            record_at(feb, BackupKind::Full, 512 * 1024),
        ];

        let stats = BackupStatistics::from_records(&records);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.total_size_mb, 2.0);
        assert_eq!(stats.by_type["full"], 2);
        assert_eq!(stats.by_type["partial"], 1);
        assert_eq!(stats.by_month["2024-01"], 2);
        assert_eq!(stats.oldest, Some(jan));
        assert_eq!(stats.newest, Some(feb));
    }

    #[test]
    fn statistics_of_nothing_are_empty() {
        let stats = BackupStatistics::from_records(&[]);
        assert_eq!(stats, BackupStatistics::default());
    }
}
