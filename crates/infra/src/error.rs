//! Backup subsystem error model.

use std::path::PathBuf;

use benchvault_core::DomainError;

use crate::journal::JournalError;
use crate::settings::SettingsError;
use crate::tools::{FallbackFailure, ToolError};

/// Result type used by the engines and the scheduler.
pub type BackupResult<T> = Result<T, BackupError>;

/// Causes an operator should check when a dump produced nothing usable.
pub const DUMP_FAILURE_HINTS: &str = "check: 1) database credentials (DB_USER, DB_PASSWORD); \
     2) the MySQL server is running and reachable; 3) the user has backup permissions; \
     4) the database name is correct";

/// Backup/restore failure.
///
/// Each variant renders a distinct message so operators can tell a missing
/// tool from bad credentials from a dump that produced nothing.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Required external utility is not installed. Never retried.
    #[error("{tool} not found (searched: {searched}); install the MySQL client tools")]
    ToolNotFound { tool: &'static str, searched: String },

    /// The password-bearing attempt failed and so did the password-less retry.
    #[error("{stage} failed with and without the configured password: {failure}")]
    CredentialFailure {
        stage: &'static str,
        failure: FallbackFailure,
    },

    /// Every dump attempt left a missing or zero-byte file.
    #[error(
        "backup file is empty or missing: {}: {failure} ({})",
        .path.display(),
        DUMP_FAILURE_HINTS
    )]
    EmptyArtifact {
        path: PathBuf,
        failure: FallbackFailure,
    },

    /// A journaled backup's file cannot be read.
    #[error("backup file for `{backup}` cannot be read: {}: {source}", .path.display())]
    MissingArtifact {
        backup: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dump could not be produced; carries the consolidated story.
    #[error("backup failed for database `{database}`: {failure} ({})", DUMP_FAILURE_HINTS)]
    DumpFailed {
        database: String,
        failure: FallbackFailure,
    },

    /// A client-tool stage failed (no password configured, single attempt).
    #[error("{stage} failed: {source}")]
    ToolFailed {
        stage: &'static str,
        #[source]
        source: ToolError,
    },

    /// A restore stage failed after earlier destructive stages succeeded.
    /// Nothing is rolled back.
    #[error(
        "restore partially applied (completed: {}); {stage} failed: {message}",
        .completed.join(", ")
    )]
    PartialFailure {
        completed: Vec<&'static str>,
        stage: &'static str,
        message: String,
    },

    /// No journal entry for the id.
    #[error("backup not found: {0}")]
    NotFound(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("invalid schedule `{expression}`: {reason}")]
    InvalidSchedule { expression: String, reason: String },

    #[error("compression error: {0}")]
    Compression(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl BackupError {
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound(id.to_string())
    }

    /// Map a failed client-tool stage to the right variant.
    pub fn from_stage_failure(stage: &'static str, failure: FallbackFailure) -> Self {
        if failure.password_attempted() {
            Self::CredentialFailure { stage, failure }
        } else {
            Self::ToolFailed {
                stage,
                source: failure.into_last(),
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<DomainError> for BackupError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidId(msg) => Self::NotFound(msg),
            DomainError::Validation(msg) => Self::InvalidSettings(msg),
        }
    }
}
