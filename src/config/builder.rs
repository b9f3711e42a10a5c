//! Session configuration and builder.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ecacontrol::config::SessionConfig;
//! use ecacontrol::TypeTag;
//!
//! let config = SessionConfig::builder()
//!     .engine_path("/usr/bin/ecasound")
//!     .read_timeout(Duration::from_secs(2))
//!     .type_override("cs-status", TypeTag::String)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.read_timeout(), Duration::from_secs(2));
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::engine::resolve_engine;
use crate::protocol::TypeTag;
use crate::{Error, Result};

/// How long to wait for a reply to a command.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// How long to wait for the startup banner.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the engine gets to exit after SIGTERM before it is killed.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Configuration for a control session.
///
/// Use [`SessionConfig::builder()`] to create a new configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    // Engine process
    pub(crate) engine: PathBuf,
    pub(crate) extra_args: Vec<String>,
    pub(crate) working_directory: Option<PathBuf>,
    pub(crate) env_vars: HashMap<String, String>,
    pub(crate) inherit_env: bool,

    // Timing
    pub(crate) read_timeout: Duration,
    pub(crate) startup_timeout: Duration,
    pub(crate) shutdown_grace: Duration,

    // Protocol
    pub(crate) type_overrides: HashMap<String, TypeTag>,
}

impl SessionConfig {
    /// Create a new builder for SessionConfig.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// The engine executable that will be spawned.
    pub fn engine(&self) -> &Path {
        &self.engine
    }

    /// How long each command waits for its reply.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// How long startup waits for the banner.
    pub fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    /// Time between SIGTERM and SIGKILL on cleanup.
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    /// Get the working directory if set.
    pub fn working_directory(&self) -> Option<&PathBuf> {
        self.working_directory.as_ref()
    }

    /// Tag overrides keyed by exact command string.
    pub fn type_overrides(&self) -> &HashMap<String, TypeTag> {
        &self.type_overrides
    }
}

/// Builder for [`SessionConfig`].
///
/// Validation happens in [`build()`](SessionConfigBuilder::build). Whether the
/// engine executable exists is only known when it is spawned.
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    engine_path: Option<PathBuf>,
    extra_args: Vec<String>,
    working_directory: Option<PathBuf>,
    env_vars: HashMap<String, String>,
    inherit_env: bool,
    read_timeout: Duration,
    startup_timeout: Duration,
    shutdown_grace: Duration,
    type_overrides: HashMap<String, TypeTag>,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self {
            engine_path: None,
            extra_args: Vec::new(),
            working_directory: None,
            env_vars: HashMap::new(),
            inherit_env: true,
            read_timeout: DEFAULT_READ_TIMEOUT,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            type_overrides: HashMap::new(),
        }
    }
}

impl SessionConfigBuilder {
    // -------------------------------------------------------------------------
    // Engine process
    // -------------------------------------------------------------------------

    /// Path to the engine executable (default: `$ECASOUND`, then `ecasound`).
    pub fn engine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.engine_path = Some(path.into());
        self
    }

    /// Extra arguments passed after the interactive-mode flags.
    pub fn extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Working directory for the engine process.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    /// Add/override environment variable for subprocess.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Don't inherit parent environment (default: inherit).
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    // -------------------------------------------------------------------------
    // Timing
    // -------------------------------------------------------------------------

    /// How long to wait for each reply before reporting a lost connection.
    pub fn read_timeout(mut self, duration: Duration) -> Self {
        self.read_timeout = duration;
        self
    }

    /// How long to wait for the startup banner.
    pub fn startup_timeout(mut self, duration: Duration) -> Self {
        self.startup_timeout = duration;
        self
    }

    /// Grace period between SIGTERM and SIGKILL on cleanup.
    pub fn shutdown_grace(mut self, duration: Duration) -> Self {
        self.shutdown_grace = duration;
        self
    }

    // -------------------------------------------------------------------------
    // Protocol
    // -------------------------------------------------------------------------

    /// Reinterpret the reply to `command` under `tag`.
    pub fn type_override(mut self, command: impl Into<String>, tag: impl Into<TypeTag>) -> Self {
        self.type_overrides.insert(command.into(), tag.into());
        self
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Build the configuration.
    ///
    /// This resolves the engine executable and validates:
    /// - All timeouts are non-zero
    /// - The working directory exists if set
    pub fn build(self) -> Result<SessionConfig> {
        for (name, duration) in [
            ("read_timeout", self.read_timeout),
            ("startup_timeout", self.startup_timeout),
            ("shutdown_grace", self.shutdown_grace),
        ] {
            if duration.is_zero() {
                return Err(Error::InvalidConfig(format!("{} must be non-zero", name)));
            }
        }

        if let Some(ref dir) = self.working_directory {
            if !dir.exists() {
                return Err(Error::InvalidConfig(format!(
                    "working directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        Ok(SessionConfig {
            engine: resolve_engine(self.engine_path.as_deref()),
            extra_args: self.extra_args,
            working_directory: self.working_directory,
            env_vars: self.env_vars,
            inherit_env: self.inherit_env,
            read_timeout: self.read_timeout,
            startup_timeout: self.startup_timeout,
            shutdown_grace: self.shutdown_grace,
            type_overrides: self.type_overrides,
        })
    }
}
