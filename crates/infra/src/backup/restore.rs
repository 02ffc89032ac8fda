//! Restore engine.

use std::path::Path;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use benchvault_core::{BackupId, BackupRecord, RestorationEvent, RestoreOptions, RestoreOutcome};

use super::compress::gunzip;
use super::BackupService;
use crate::error::{BackupError, BackupResult};
use crate::tools::{
    resolve_tool, run_with_credential_fallback, FallbackFailure, ToolInvocation, ToolKind,
};

const STAGE_DROP: &str = "drop database";
const STAGE_CREATE: &str = "create database";
const STAGE_APPLY: &str = "apply dump";

/// Backtick-quote a MySQL identifier.
fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Map a stage failure, accounting for stages that already changed the server.
fn stage_error(
    completed: &[&'static str],
    stage: &'static str,
    failure: FallbackFailure,
) -> BackupError {
    if completed.is_empty() {
        BackupError::from_stage_failure(stage, failure)
    } else {
        BackupError::PartialFailure {
            completed: completed.to_vec(),
            stage,
            message: failure.to_string(),
        }
    }
}

/// Map a failure to stage the decompressed dump on disk.
fn temp_write_error(completed: &[&'static str], temp: &Path, err: std::io::Error) -> BackupError {
    if completed.is_empty() {
        BackupError::Io(err)
    } else {
        BackupError::PartialFailure {
            completed: completed.to_vec(),
            stage: STAGE_APPLY,
            message: format!("could not write {}: {err}", temp.display()),
        }
    }
}

/// Write the decompressed dump, removing whatever was written on failure.
async fn write_temp(path: &Path, sql: &[u8]) -> std::io::Result<()> {
    let written = tokio::fs::write(path, sql).await;
    if written.is_err() {
        remove_temp(path).await;
    }
    written
}

fn missing_artifact(backup: &BackupRecord, source: std::io::Error) -> BackupError {
    BackupError::MissingArtifact {
        backup: backup.name.clone(),
        path: backup.filepath.clone(),
        source,
    }
}

impl BackupService {
    /// Apply a journaled backup to the configured database.
    ///
    /// Stages run in order: optional drop, optional create, apply. A failure
    /// after drop or create has run leaves the server as those stages left it.
    #[instrument(skip(self, options), fields(backup_id = %id))]
    pub async fn restore_backup(
        &self,
        id: BackupId,
        options: RestoreOptions,
    ) -> BackupResult<RestoreOutcome> {
        let backup = self.get_backup(id).await?;
        let client = resolve_tool(ToolKind::Client, self.config.client_tool.as_deref())?;
        let database = self.config.connection.database.clone();

        info!(backup = %backup.name, database = %database, "restoring backup");

        // Read the artifact before touching the server.
        let sql = if backup.compressed {
            let compressed = tokio::fs::read(&backup.filepath)
                .await
                .map_err(|e| missing_artifact(&backup, e))?;
            Some(gunzip(compressed).await?)
        } else {
            tokio::fs::metadata(&backup.filepath)
                .await
                .map_err(|e| missing_artifact(&backup, e))?;
            None
        };

        let mut completed: Vec<&'static str> = Vec::new();

        if options.drop_database {
            let statement = format!("DROP DATABASE IF EXISTS {}", quote_ident(&database));
            self.client_stage(STAGE_DROP, &client, |inv| inv.arg("-e").arg(statement.as_str()))
                .await
                .map_err(|f| stage_error(&completed, STAGE_DROP, f))?;
            warn!(database = %database, "database dropped");
            completed.push(STAGE_DROP);
        }

        if options.create_database {
            let statement = format!("CREATE DATABASE IF NOT EXISTS {}", quote_ident(&database));
            self.client_stage(STAGE_CREATE, &client, |inv| {
                inv.arg("-e").arg(statement.as_str())
            })
            .await
            .map_err(|f| stage_error(&completed, STAGE_CREATE, f))?;
            completed.push(STAGE_CREATE);
        }

        let applied = match sql {
            Some(sql) => {
                let temp = self.config.artifact_path(format!(
                    "temp_restore_{}.sql",
                    Utc::now().timestamp_millis()
                ));
                write_temp(&temp, &sql)
                    .await
                    .map_err(|e| temp_write_error(&completed, &temp, e))?;
                let applied = self.apply(&client, &database, &temp).await;
                remove_temp(&temp).await;
                applied
            }
            None => self.apply(&client, &database, &backup.filepath).await,
        };
        applied.map_err(|f| stage_error(&completed, STAGE_APPLY, f))?;

        // The dump is applied; a journal failure only loses the audit entry.
        if let Err(e) = self
            .journal
            .append_restoration(RestorationEvent::new(id, options.user_id.clone()))
            .await
        {
            error!(backup_id = %id, error = %e, "could not record restoration");
        }

        info!(backup = %backup.name, "backup restored");
        Ok(RestoreOutcome {
            success: true,
            backup_name: backup.name,
        })
    }

    async fn apply(
        &self,
        client: &Path,
        database: &str,
        source: &Path,
    ) -> Result<(), FallbackFailure> {
        self.client_stage(STAGE_APPLY, client, |inv| inv.arg(database).stdin_file(source))
            .await
    }

    /// Run one client-tool stage with credential fallback.
    async fn client_stage<F>(
        &self,
        stage: &'static str,
        client: &Path,
        extra: F,
    ) -> Result<(), FallbackFailure>
    where
        F: Fn(ToolInvocation) -> ToolInvocation,
    {
        let conn = &self.config.connection;
        let timeout = self.config.tool_timeout;
        run_with_credential_fallback(stage, conn.password(), |password| {
            extra(
                ToolInvocation::connect(client, conn)
                    .password(password)
                    .timeout(timeout),
            )
        })
        .await
        .map(|_| ())
    }
}

async fn remove_temp(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove temporary restore file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("FZ"), "`FZ`");
        assert_eq!(quote_ident("we`ird"), "`we``ird`");
    }

    #[tokio::test]
    async fn failure_after_destructive_stage_is_partial() {
        let failure = run_with_credential_fallback(STAGE_APPLY, None, |_| {
            ToolInvocation::new("/nonexistent/mysql")
        })
        .await
        .unwrap_err();
        assert!(matches!(failure.last(), ToolError::Spawn { .. }));

        match stage_error(&[STAGE_DROP, STAGE_CREATE], STAGE_APPLY, failure) {
            BackupError::PartialFailure { completed, stage, .. } => {
                assert_eq!(completed, vec![STAGE_DROP, STAGE_CREATE]);
                assert_eq!(stage, STAGE_APPLY);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unwritable_temp_file_is_partial_after_create() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes the write fail regardless of privileges.
        let temp = dir.path().join("temp_restore_1.sql");
        std::fs::create_dir(&temp).unwrap();

        let err = write_temp(&temp, b"SELECT 1;").await.unwrap_err();
        match temp_write_error(&[STAGE_CREATE], &temp, err) {
            BackupError::PartialFailure { completed, stage, message } => {
                assert_eq!(completed, vec![STAGE_CREATE]);
                assert_eq!(stage, STAGE_APPLY);
                assert!(message.contains("temp_restore_1.sql"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn failed_temp_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("missing").join("temp_restore_2.sql");

        let err = write_temp(&temp, b"SELECT 1;").await.unwrap_err();
        assert!(matches!(temp_write_error(&[], &temp, err), BackupError::Io(_)));
        assert!(!temp.exists());
    }
}
