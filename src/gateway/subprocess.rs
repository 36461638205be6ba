//! CLI backend spawning.

use std::ffi::OsStr;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::GatewayError;

/// A locally installed CLI that answers a prompt on stdout.
#[derive(Debug, Clone)]
pub struct Cli {
    /// Name used in error messages.
    pub name: &'static str,
    /// Executable to run. Either a bare name looked up on PATH or a path.
    pub program: String,
    pub timeout: Duration,
}

impl Cli {
    pub fn new(name: &'static str, timeout: Duration) -> Self {
        Self {
            name,
            program: name.to_string(),
            timeout,
        }
    }

    /// Check that the CLI is installed and accessible.
    ///
    /// Uses the `which` crate for cross-platform executable detection, then
    /// confirms `--version` exits successfully.
    pub async fn check_installed(&self) -> Result<(), GatewayError> {
        if which::which(&self.program).is_err() {
            return Err(GatewayError::NotInstalled { cli: self.name });
        }

        let version_check = Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map_err(|source| GatewayError::SpawnFailed {
                cli: self.name,
                source,
            })?;

        if !version_check.status.success() {
            return Err(GatewayError::NotInstalled { cli: self.name });
        }

        Ok(())
    }

    /// Run the CLI with `args`, feed `input` on stdin, and return its stdout.
    ///
    /// The prompt goes through stdin because a single argv element is capped
    /// (128 KiB on Linux) and prompts carry whole file contents.
    ///
    /// Fails with `Timeout` when the process outlives the configured timeout
    /// and with `NonZeroExit` (carrying stderr) on a failed exit status.
    pub async fn run<I, S>(&self, args: I, input: &str) -> Result<String, GatewayError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        debug!(cli = self.name, bytes = input.len(), "spawning backend CLI");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GatewayError::SpawnFailed {
                cli: self.name,
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| GatewayError::ExecutionFailed {
                cli: self.name,
                message: "stdin was not captured".to_string(),
            })?;

        let write_input = async move {
            let written = stdin.write_all(input.as_bytes()).await;
            // Closing stdin signals end of prompt.
            drop(stdin);
            match written {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        };

        let (written, output) = timeout(self.timeout, async {
            tokio::join!(write_input, child.wait_with_output())
        })
        .await
        .map_err(|_| GatewayError::Timeout {
            cli: self.name,
            secs: self.timeout.as_secs(),
        })?;

        let output = output.map_err(|source| GatewayError::SpawnFailed {
            cli: self.name,
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let code = output.status.code().unwrap_or(-1);
            return Err(GatewayError::NonZeroExit {
                cli: self.name,
                code,
                stderr,
            });
        }

        written.map_err(|e| GatewayError::ExecutionFailed {
            cli: self.name,
            message: format!("Failed to write prompt to stdin: {}", e),
        })?;

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Write an executable shell script standing in for a backend CLI.
#[cfg(all(test, unix))]
pub(crate) fn fake_cli(dir: &std::path::Path, name: &str, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let script = format!(
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo \"{name} 1.0.0\"; exit 0; fi\n{body}\n"
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}
