//! Credential fallback.
//!
//! Every stage that talks to the database server goes through
//! [`run_with_credential_fallback`]: when a password is configured the first
//! attempt carries it, and on any failure exactly one retry runs without it.
//! Local installs frequently use a password-less root account while the
//! configured password belongs to another environment.

use std::fmt;

use tracing::{info, warn};

use super::exec::{ToolError, ToolInvocation, ToolOutput};

/// Both attempts of a stage failed (or the only attempt, when no password was
/// configured).
#[derive(Debug)]
pub struct FallbackFailure {
    with_password: Option<ToolError>,
    last: ToolError,
}

impl FallbackFailure {
    fn single(last: ToolError) -> Self {
        Self {
            with_password: None,
            last,
        }
    }

    /// Whether a password-bearing attempt was made before the last one.
    pub fn password_attempted(&self) -> bool {
        self.with_password.is_some()
    }

    pub fn with_password(&self) -> Option<&ToolError> {
        self.with_password.as_ref()
    }

    pub fn last(&self) -> &ToolError {
        &self.last
    }

    pub fn into_last(self) -> ToolError {
        self.last
    }
}

impl fmt::Display for FallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.with_password {
            Some(first) => write!(
                f,
                "with password: {first}; without password: {}",
                self.last
            ),
            None => write!(f, "{}", self.last),
        }
    }
}

impl std::error::Error for FallbackFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last)
    }
}

/// Run a stage, retrying once without the password if the first attempt fails.
///
/// `build` is called with `Some(password)` for the first attempt and `None`
/// for the retry; it must produce a fresh invocation each time.
pub async fn run_with_credential_fallback<F>(
    stage: &'static str,
    password: Option<&str>,
    build: F,
) -> Result<ToolOutput, FallbackFailure>
where
    F: Fn(Option<&str>) -> ToolInvocation,
{
    let Some(password) = password else {
        return build(None).run().await.map_err(FallbackFailure::single);
    };

    let first = match build(Some(password)).run().await {
        Ok(output) => return Ok(output),
        Err(err) => err,
    };
    warn!(stage, error = %first, "attempt with configured password failed; retrying without password");

    match build(None).run().await {
        Ok(output) => {
            info!(stage, "password-less retry succeeded");
            Ok(output)
        }
        Err(last) => Err(FallbackFailure {
            with_password: Some(first),
            last,
        }),
    }
}
