//! Error mapping for the control surface.
//!
//! Every failure becomes a stable machine-readable `code`, an HTTP-equivalent
//! status and a human message, rendered as `{"error": code, "message": ...}`.

use serde_json::json;

use benchvault_infra::BackupError;

/// Control-surface result.
pub type ControlResult<T> = Result<T, ControlError>;

/// A failure as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ControlError {
    pub status: u16,
    pub code: &'static str,
    pub message: String,
}

impl ControlError {
    pub fn new(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "not_found", message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(400, "invalid_request", message)
    }

    /// JSON body: `{"error": code, "message": message}`.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": self.code,
            "message": self.message,
        })
    }
}

pub fn backup_error_to_control(err: BackupError) -> ControlError {
    let message = err.to_string();
    match err {
        BackupError::NotFound(_) => ControlError::not_found(message),
        BackupError::ToolNotFound { .. } => ControlError::new(503, "tool_not_found", message),
        BackupError::InvalidSettings(_) | BackupError::InvalidSchedule { .. } => {
            ControlError::new(400, "invalid_settings", message)
        }
        BackupError::CredentialFailure { .. } => ControlError::new(500, "credential_failure", message),
        BackupError::DumpFailed { .. } => ControlError::new(500, "backup_failed", message),
        BackupError::EmptyArtifact { .. } => ControlError::new(500, "empty_backup", message),
        BackupError::MissingArtifact { .. } => ControlError::new(500, "backup_file_missing", message),
        BackupError::ToolFailed { .. } => ControlError::new(500, "tool_failed", message),
        BackupError::PartialFailure { .. } => ControlError::new(500, "partial_restore", message),
        BackupError::Compression(_) => ControlError::new(500, "compression_error", message),
        BackupError::Io(_) => ControlError::new(500, "io_error", message),
        BackupError::Journal(_) => ControlError::new(500, "journal_error", message),
        BackupError::Settings(_) => ControlError::new(500, "settings_error", message),
    }
}

impl From<BackupError> for ControlError {
    fn from(err: BackupError) -> Self {
        backup_error_to_control(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ControlError::from(BackupError::not_found("x")).status, 404);
        assert_eq!(
            ControlError::from(BackupError::ToolNotFound {
                tool: "mysql",
                searched: "$PATH".into()
            })
            .code,
            "tool_not_found"
        );
        assert_eq!(
            ControlError::from(BackupError::InvalidSettings("bad day".into())).status,
            400
        );
        assert_eq!(
            ControlError::from(BackupError::Compression("bad gzip".into())).status,
            500
        );

        let missing = ControlError::from(BackupError::MissingArtifact {
            backup: "nightly".into(),
            path: "/var/backups/nightly.sql.gz".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(missing.code, "backup_file_missing");
        assert!(missing.message.contains("/var/backups/nightly.sql.gz"));
    }

    #[test]
    fn json_body_shape() {
        let err = ControlError::not_found("backup not found: 42");
        assert_eq!(
            err.to_json(),
            json!({ "error": "not_found", "message": "backup not found: 42" })
        );
    }
}
