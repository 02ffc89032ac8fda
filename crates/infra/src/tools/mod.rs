//! External database utilities.
//!
//! ## Components
//!
//! - `resolve`: locate the dump utility (`mysqldump`) and client utility
//!   (`mysql`) by probing well-known install paths plus `PATH`
//! - `exec`: run one invocation with a hard timeout, capturing stderr
//! - `fallback`: the single "try with password, retry once without" helper
//!   shared by every backup and restore stage

mod exec;
mod fallback;
mod resolve;

pub use exec::{ToolError, ToolInvocation, ToolOutput};
pub use fallback::{run_with_credential_fallback, FallbackFailure};
pub use resolve::{resolve_tool, ToolKind};
