//! Backup control surface and process wiring.
//!
//! [`BackupControl`] exposes the subsystem's operations (settings, scheduler
//! start/stop, test backup, create/list/get/restore/delete, cleanup,
//! statistics) with transport-neutral error mapping.

pub mod bootstrap;
pub mod control;
pub mod errors;

pub use control::BackupControl;
pub use errors::{ControlError, ControlResult};
