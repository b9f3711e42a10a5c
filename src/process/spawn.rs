//! Process spawning, startup handshake and shutdown.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};

use super::io::{CommandWriter, PipeReader};
use super::{MIN_ENGINE_VERSION, QUIT_COMMAND};
use crate::config::SessionConfig;
use crate::{Error, Result};

/// What the engine printed before its first prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineBanner {
    /// Full banner text.
    pub text: String,
    /// Version token, e.g. `2.9.3`.
    pub version: String,
}

/// A running engine process and its pipes.
///
/// # Cleanup
///
/// Call [`cleanup`](Self::cleanup) on every exit path. Dropping an
/// `EngineProcess` only starts a kill of a child that is still running.
pub struct EngineProcess {
    child: Option<Child>,
    reader: PipeReader,
    writer: CommandWriter,
    exit_status: Option<ExitStatus>,
    closed: bool,
}

impl EngineProcess {
    /// Spawn the engine in interactive, well-formed output mode.
    ///
    /// The executable is started directly, without a shell.
    pub fn spawn(config: &SessionConfig) -> Result<Self> {
        let mut cmd = build_command(config);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::null());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::EngineNotFound {
                    searched: config.engine().display().to_string(),
                }
            } else {
                Error::ProcessSpawn(e)
            }
        })?;

        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;

        tracing::debug!(
            "spawned {} (pid {:?})",
            config.engine().display(),
            child.id()
        );

        Ok(Self {
            child: Some(child),
            reader: PipeReader::new(stdout),
            writer: CommandWriter::new(stdin),
            exit_status: None,
            closed: false,
        })
    }

    /// Attach to an engine reachable through an existing reader/writer pair.
    ///
    /// There is no child to supervise; cleanup only sends `quit` and closes
    /// the writer.
    pub fn from_pipes(
        reader: impl AsyncRead + Send + Sync + Unpin + 'static,
        writer: impl AsyncWrite + Send + Sync + Unpin + 'static,
    ) -> Self {
        Self {
            child: None,
            reader: PipeReader::new(reader),
            writer: CommandWriter::new(writer),
            exit_status: None,
            closed: false,
        }
    }

    /// Read the startup banner and check the engine version.
    pub async fn handshake(&mut self, timeout: Duration) -> Result<EngineBanner> {
        let bytes = self.reader.read_with_timeout(timeout).await?.unwrap_or_default();
        let text = String::from_utf8_lossy(&bytes).into_owned();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            tracing::debug!("engine: {}", line);
        }

        let version = engine_version(&text).ok_or_else(|| Error::BannerUnparsable {
            banner: text.clone(),
        })?;
        let parsed = parse_version(version).ok_or_else(|| Error::BannerUnparsable {
            banner: text.clone(),
        })?;
        if version_below_min(parsed) {
            return Err(Error::UnsupportedVersion {
                found: version.to_string(),
                required: MIN_ENGINE_VERSION,
            });
        }

        tracing::info!("connected to ecasound v{}", version);
        Ok(EngineBanner {
            version: version.to_string(),
            text,
        })
    }

    /// Write a plain command (`<command>\r`).
    pub async fn send(&mut self, command: &str) -> Result<()> {
        self.writer.write_command(command).await
    }

    /// Write a command with a float argument (`<command> <arg>\n`).
    pub async fn send_float(&mut self, command: &str, arg: Option<f64>) -> Result<()> {
        self.writer.write_float_command(command, arg).await
    }

    /// Read the next reply, or `None` if none completed before `timeout`.
    pub async fn read_response(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        self.reader.read_with_timeout(timeout).await
    }

    /// Shut the engine down.
    ///
    /// Sends `quit`, then SIGTERM, and waits up to `grace` for the child to
    /// exit before killing it. Safe to call repeatedly and on a child that
    /// has already exited; later calls return the recorded status.
    pub async fn cleanup(&mut self, grace: Duration) -> Result<Option<ExitStatus>> {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.writer.write_command(QUIT_COMMAND).await {
                tracing::debug!("could not send quit: {}", e);
            }
            if let Err(e) = self.writer.shutdown().await {
                tracing::debug!("could not close engine stdin: {}", e);
            }
        }

        if self.exit_status.is_some() {
            return Ok(self.exit_status);
        }
        let Some(child) = self.child.as_mut() else {
            return Ok(None);
        };

        if let Some(status) = child.try_wait().map_err(Error::io)? {
            tracing::debug!("engine already exited: {}", status);
            self.exit_status = Some(status);
            return Ok(Some(status));
        }

        terminate(child);

        let status = match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => status.map_err(Error::io)?,
            Err(_) => {
                tracing::warn!("engine did not exit within {:?}, killing it", grace);
                child.kill().await.map_err(Error::io)?;
                child.wait().await.map_err(Error::io)?
            }
        };

        tracing::info!("engine exited: {}", status);
        self.exit_status = Some(status);
        Ok(Some(status))
    }

    /// Get the process ID of the running engine.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Check if a child process is still running.
    pub fn is_running(&self) -> bool {
        self.exit_status.is_none() && self.pid().is_some()
    }

    /// Exit status recorded by [`cleanup`](Self::cleanup).
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Whether `quit` has been sent and stdin closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if self.exit_status.is_none() {
            if let Some(child) = self.child.as_mut() {
                let _ = child.start_kill();
            }
        }
    }
}

fn missing_pipe(name: &str) -> Error {
    Error::ProcessSpawn(std::io::Error::other(format!("engine {} was not captured", name)))
}

/// Build a tokio Command from the config.
fn build_command(config: &SessionConfig) -> Command {
    let mut cmd = Command::new(config.engine());

    if let Some(ref dir) = config.working_directory {
        cmd.current_dir(dir);
    }

    if !config.inherit_env {
        cmd.env_clear();
    }
    cmd.envs(&config.env_vars);

    cmd.args(build_args(config));
    cmd
}

/// Interactive control mode with well-formed integer output.
fn build_args(config: &SessionConfig) -> Vec<String> {
    let mut args = vec![
        "-c".to_string(),
        "-E".to_string(),
        "int-output-mode-wellformed".to_string(),
    ];
    args.extend(config.extra_args.iter().cloned());
    args
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::debug!("SIGTERM to engine {} failed: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.start_kill();
}

/// Find the version token in a banner line like `ecasound v2.9.3 (C) ...`.
fn engine_version(banner: &str) -> Option<&str> {
    const MARKER: &str = "ecasound v";
    let start = banner.find(MARKER)? + MARKER.len();
    banner[start..].split_whitespace().next()
}

/// Parse `major.minor[.patch]` into (major, minor).
fn parse_version(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('.');
    let major = numeric_prefix(parts.next()?)?;
    let minor = numeric_prefix(parts.next()?)?;
    Some((major, minor))
}

fn numeric_prefix(part: &str) -> Option<u32> {
    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Check if a version is below the minimum required.
fn version_below_min(version: (u32, u32)) -> bool {
    let min = parse_version(MIN_ENGINE_VERSION).unwrap_or((2, 2));
    version < min
}
