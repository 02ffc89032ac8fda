//! Backup creation.

use std::path::Path;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use benchvault_core::{
    artifact_stem, format_size_mb, BackupId, BackupOptions, BackupRecord, MAX_NAME_LEN,
};

use super::compress::gzip_file;
use super::BackupService;
use crate::error::{BackupError, BackupResult};
use crate::tools::{resolve_tool, run_with_credential_fallback, ToolInvocation, ToolKind};

/// `--no-data` for structure-only, `--no-create-info` for data-only, nothing
/// otherwise (including the degenerate "neither" request).
fn content_flags(options: &BackupOptions) -> &'static [&'static str] {
    match (options.include_structure, options.include_data) {
        (true, false) => &["--no-data"],
        (false, true) => &["--no-create-info"],
        _ => &[],
    }
}

fn artifact_exists(dir: &Path, stem: &str) -> bool {
    dir.join(format!("{stem}.sql")).exists() || dir.join(format!("{stem}.sql.gz")).exists()
}

/// First stem not already used by an artifact: `stem`, `stem_2`, `stem_3`, ...
///
/// Suffixed stems are shortened so they stay within [`MAX_NAME_LEN`].
fn unique_stem(dir: &Path, stem: String) -> String {
    if !artifact_exists(dir, &stem) {
        return stem;
    }
    (2u32..)
        .map(|n| {
            let suffix = format!("_{n}");
            let keep = MAX_NAME_LEN.saturating_sub(suffix.len());
            let base: String = stem.chars().take(keep).collect();
            format!("{base}{suffix}")
        })
        .find(|candidate| !artifact_exists(dir, candidate))
        .unwrap_or(stem)
}

impl BackupService {
    /// Dump the configured database into a new artifact and journal it.
    #[instrument(skip(self, options), fields(database = %self.config.connection.database))]
    pub async fn create_backup(&self, options: BackupOptions) -> BackupResult<BackupRecord> {
        let dump_tool = resolve_tool(ToolKind::Dump, self.config.dump_tool.as_deref())?;
        let conn = &self.config.connection;
        let dir = &self.config.backup_dir;

        tokio::fs::create_dir_all(dir).await?;

        let stem = unique_stem(
            dir,
            artifact_stem(options.name.as_deref(), &conn.database, Utc::now()),
        );
        let raw_path = self.config.artifact_path(format!("{stem}.sql"));
        let tables = options.table_scope().unwrap_or_default();
        let timeout = self.config.tool_timeout;

        info!(backup = %stem, kind = %options.kind(), "creating backup");

        let dumped = run_with_credential_fallback("dump", conn.password(), |password| {
            ToolInvocation::connect(&dump_tool, conn)
                .password(password)
                .args(content_flags(&options).iter().copied())
                .arg(conn.database.as_str())
                .args(tables.iter().cloned())
                .stdout_file(&raw_path)
                .require_output()
                .timeout(timeout)
        })
        .await;

        if let Err(failure) = dumped {
            error!(backup = %stem, error = %failure, "backup failed");
            remove_leftover(&raw_path).await;
            return Err(if failure.last().is_empty_output() {
                BackupError::EmptyArtifact {
                    path: raw_path,
                    failure,
                }
            } else {
                BackupError::DumpFailed {
                    database: conn.database.clone(),
                    failure,
                }
            });
        }

        let (filepath, size) = if options.compress {
            let gz_path = self.config.artifact_path(format!("{stem}.sql.gz"));
            let compressed = match gzip_file(&raw_path, &gz_path).await {
                Ok(size) => tokio::fs::remove_file(&raw_path)
                    .await
                    .map(|()| size)
                    .map_err(BackupError::from),
                Err(e) => Err(e),
            };
            match compressed {
                Ok(size) => (gz_path, size),
                Err(e) => {
                    error!(backup = %stem, error = %e, "backup compression failed");
                    remove_leftover(&raw_path).await;
                    remove_leftover(&gz_path).await;
                    return Err(e);
                }
            }
        } else {
            let size = tokio::fs::metadata(&raw_path).await?.len();
            (raw_path, size)
        };

        let record = BackupRecord {
            id: BackupId::new(),
            name: options
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| stem.clone()),
            description: options.description.clone(),
            filename: file_name(&filepath),
            size,
            size_mb: format_size_mb(size),
            compressed: options.compress,
            database: conn.database.clone(),
            created_at: Utc::now(),
            created_by: options.user_id.clone(),
            kind: options.kind(),
            filepath,
        };

        self.journal.append_backup(record.clone()).await?;

        info!(
            backup_id = %record.id,
            file = %record.filename,
            size_mb = %record.size_mb,
            "backup created"
        );
        Ok(record)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn remove_leftover(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove failed dump output"),
    }
}
