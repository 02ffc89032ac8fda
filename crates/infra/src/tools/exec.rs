//! Bounded execution of one external tool invocation.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::ConnectionParams;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Failure of a single tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("could not open {}: {source}", .path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The tool exceeded its time budget and was killed.
    #[error("{program} timed out after {:?}", .timeout)]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {}", exit_detail(.code, .stderr))]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool exited cleanly but its output file is zero bytes.
    #[error("{program} produced an empty file: {}", .path.display())]
    EmptyOutput { program: String, path: PathBuf },
}

fn exit_detail(code: &Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    };
    if stderr.is_empty() {
        status
    } else {
        format!("{status}: {stderr}")
    }
}

impl ToolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_empty_output(&self) -> bool {
        matches!(self, Self::EmptyOutput { .. })
    }
}

/// What a successful invocation left behind.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Captured stdout; empty when stdout was redirected to a file.
    pub stdout: String,
    pub stderr: String,
    /// Size of the redirected stdout file, if any.
    pub output_len: Option<u64>,
}

/// One fully described tool run: program, arguments, redirections, timeout.
///
/// The password is held apart from the other arguments so it can be inserted
/// at spawn time and never shows up in `Display` output or logs.
#[derive(Clone)]
pub struct ToolInvocation {
    program: PathBuf,
    args: Vec<String>,
    password: Option<(usize, String)>,
    stdin: Option<PathBuf>,
    stdout: Option<PathBuf>,
    require_output: bool,
    timeout: Duration,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            password: None,
            stdin: None,
            stdout: None,
            require_output: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// `program -h <host> -P <port> -u <user>`.
    pub fn connect(program: impl Into<PathBuf>, conn: &ConnectionParams) -> Self {
        Self::new(program).args([
            "-h".to_string(),
            conn.host.clone(),
            "-P".to_string(),
            conn.port.to_string(),
            "-u".to_string(),
            conn.user.clone(),
        ])
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add `--password=<pw>` at the current argument position.
    pub fn password(mut self, password: Option<&str>) -> Self {
        self.password = password.map(|pw| (self.args.len(), pw.to_string()));
        self
    }

    pub fn stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn stdout_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// Treat a zero-byte stdout file as failure.
    pub fn require_output(mut self) -> Self {
        self.require_output = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    fn spawn_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some((at, pw)) = &self.password {
            args.insert((*at).min(args.len()), format!("--password={pw}"));
        }
        args
    }

    /// Run to completion, killing the child if the timeout elapses.
    pub async fn run(&self) -> Result<ToolOutput, ToolError> {
        let program = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(self.spawn_args())
            .kill_on_drop(true)
            .stderr(Stdio::piped());

        match &self.stdin {
            Some(path) => {
                let file = open_redirect(path, false).await?;
                cmd.stdin(Stdio::from(file));
            }
            None => {
                cmd.stdin(Stdio::null());
            }
        }
        match &self.stdout {
            Some(path) => {
                let file = open_redirect(path, true).await?;
                cmd.stdout(Stdio::from(file));
            }
            None => {
                cmd.stdout(Stdio::piped());
            }
        }

        let child = cmd.spawn().map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

        // Dropping the wait future drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ToolError::Spawn {
                program: program.clone(),
                source,
            })?,
            Err(_) => {
                return Err(ToolError::Timeout {
                    program,
                    timeout: self.timeout,
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ToolError::Exit {
                program,
                code: output.status.code(),
                stderr,
            });
        }

        let output_len = match &self.stdout {
            Some(path) => {
                let len = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
                if len == 0 && self.require_output {
                    return Err(ToolError::EmptyOutput {
                        program,
                        path: path.clone(),
                    });
                }
                Some(len)
            }
            None => None,
        };

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
            output_len,
        })
    }
}

async fn open_redirect(path: &Path, create: bool) -> Result<std::fs::File, ToolError> {
    let file = if create {
        tokio::fs::File::create(path).await
    } else {
        tokio::fs::File::open(path).await
    };
    let file = file.map_err(|source| ToolError::Redirect {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.into_std().await)
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program_name())?;
        let mut args = self.args.iter().map(String::as_str).collect::<Vec<_>>();
        if let Some((at, _)) = &self.password {
            args.insert((*at).min(args.len()), "--password=***");
        }
        for arg in args {
            write!(f, " {arg}")?;
        }
        if let Some(path) = &self.stdin {
            write!(f, " < {}", path.display())?;
        }
        if let Some(path) = &self.stdout {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

impl fmt::Debug for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ToolInvocation({self})")
    }
}
