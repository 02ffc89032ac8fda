//! Tool discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BackupError, BackupResult};

/// The two external utilities the subsystem depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Captures a dump (`mysqldump`).
    Dump,
    /// Applies SQL (`mysql`).
    Client,
}

impl ToolKind {
    pub fn binary_name(&self) -> &'static str {
        match self {
            ToolKind::Dump => "mysqldump",
            ToolKind::Client => "mysql",
        }
    }
}

/// One place to look for a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Probe {
    Fixed(PathBuf),
    SearchPath,
}

/// Probe order: bundled XAMPP install, `PATH`, distro location, Homebrew.
fn probes(kind: ToolKind) -> Vec<Probe> {
    let name = kind.binary_name();
    vec![
        Probe::Fixed(Path::new("/opt/lampp/bin").join(name)),
        Probe::SearchPath,
        Probe::Fixed(Path::new("/usr/bin").join(name)),
        Probe::Fixed(Path::new("/usr/local/bin").join(name)),
    ]
}

fn describe_probes(kind: ToolKind) -> String {
    probes(kind)
        .into_iter()
        .map(|p| match p {
            Probe::Fixed(path) => path.display().to_string(),
            Probe::SearchPath => "$PATH".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Locate `kind`, honoring an explicitly configured path first.
///
/// A configured path that does not exist is reported as not found rather than
/// silently falling back to the probe list.
pub fn resolve_tool(kind: ToolKind, configured: Option<&Path>) -> BackupResult<PathBuf> {
    let tool = kind.binary_name();

    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(BackupError::ToolNotFound {
            tool,
            searched: path.display().to_string(),
        });
    }

    for probe in probes(kind) {
        let found = match probe {
            Probe::Fixed(path) => path.is_file().then_some(path),
            Probe::SearchPath => which::which(tool).ok(),
        };
        if let Some(path) = found {
            debug!(tool, path = %path.display(), "resolved external tool");
            return Ok(path);
        }
    }

    Err(BackupError::ToolNotFound {
        tool,
        searched: describe_probes(kind),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_order_prefers_bundled_install() {
        let order = probes(ToolKind::Dump);
        assert_eq!(order[0], Probe::Fixed(PathBuf::from("/opt/lampp/bin/mysqldump")));
        assert_eq!(order[1], Probe::SearchPath);
        assert_eq!(order.len(), 4);
        assert_eq!(
            describe_probes(ToolKind::Client),
            "/opt/lampp/bin/mysql, $PATH, /usr/bin/mysql, /usr/local/bin/mysql"
        );
    }

    #[test]
    fn configured_path_must_exist() {
        let err = resolve_tool(ToolKind::Dump, Some(Path::new("/definitely/not/here/mysqldump")))
            .unwrap_err();
        match err {
            BackupError::ToolNotFound { tool, searched } => {
                assert_eq!(tool, "mysqldump");
                assert!(searched.contains("/definitely/not/here"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn configured_path_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("mysql");
        std::fs::write(&fake, "#!/bin/sh\n").unwrap();
        assert_eq!(resolve_tool(ToolKind::Client, Some(&fake)).unwrap(), fake);
    }
}
