//! Artifact naming rules.
//!
//! A caller-supplied display name is kept verbatim on the record, but the file
//! on disk uses a filesystem-safe token derived from it.

use chrono::{DateTime, Utc};

/// Maximum length (in bytes, always ASCII) of a sanitized artifact name.
pub const MAX_NAME_LEN: usize = 50;

/// Derive a filesystem-safe token from a display name.
///
/// Every character outside `[A-Za-z0-9-]` acts as a separator; runs of
/// separators collapse into a single `_`, separators at either end are
/// dropped, and the result is capped at [`MAX_NAME_LEN`].
///
/// `"My Backup #1!"` becomes `"My_Backup_1"`.
pub fn sanitize_backup_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len().min(MAX_NAME_LEN));
    let mut pending_sep = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }

    out.truncate(MAX_NAME_LEN);
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Name used when the caller did not supply one: `backup_<database>_<timestamp>`.
pub fn default_backup_name(database: &str, at: DateTime<Utc>) -> String {
    format!("backup_{}_{}", database, at.format("%Y-%m-%dT%H-%M-%S"))
}

/// Resolve the artifact stem for a backup request.
///
/// Falls back to [`default_backup_name`] when no name was given or when the
/// name has no safe characters at all (e.g. `"###"`).
pub fn artifact_stem(name: Option<&str>, database: &str, at: DateTime<Utc>) -> String {
    match name.map(sanitize_backup_name) {
        Some(token) if !token.is_empty() => token,
        _ => default_backup_name(database, at),
    }
}
