//! Metadata journal.
//!
//! The journal is a single JSON document (`backups_metadata.json`) listing
//! every backup record and every restoration event. It is the only catalog:
//! an artifact on disk without a record is invisible.
//!
//! ## Components
//!
//! - `JournalFile`: load / atomic persist of the document
//! - `JournalHandle`: cloneable handle to the actor task that owns the file;
//!   every read-modify-write runs as one serialized step

mod actor;
mod file;

pub use actor::JournalHandle;
pub use file::JournalFile;

/// Journal failure.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("journal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The owning task is gone (runtime shutting down).
    #[error("journal task is not running")]
    Closed,
}
