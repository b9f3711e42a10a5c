//! Control sessions.
//!
//! A [`Session`] owns one engine process and turns command strings into typed
//! [`Reply`] values. The last value of each type is kept so it can be read
//! back later through the `last_*` accessors.
//!
//! # Example
//!
//! ```no_run
//! use ecacontrol::{Session, SessionConfig};
//!
//! # async fn example() -> ecacontrol::Result<()> {
//! let mut session = Session::start(SessionConfig::builder().build()?).await?;
//!
//! session.command("cs-add play_chainsetup").await?;
//! session.command("c-add 1st_chain").await?;
//! session.command("c-list").await?;
//! assert_eq!(session.last_string_list(), Some(&["1st_chain".to_string()][..]));
//!
//! session.cleanup().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::process::ExitStatus;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::process::{EngineBanner, EngineProcess};
use crate::protocol::{grammar, Reply, TypeTag, TypedValueStore};
use crate::{Error, Result};

/// Payload of the `e` reply produced when the engine stops answering.
pub const CONNECTION_LOST: &str = "Connection to the processing engine was lost.";

/// How a command line is terminated on the wire.
#[derive(Debug, Clone, Copy)]
enum Outgoing {
    Plain,
    WithFloat(Option<f64>),
}

/// A control session with one engine process.
///
/// Every command operation takes `&mut self`, so there is never more than one
/// command in flight.
///
/// # Errors and replies
///
/// Engine errors, framing problems and a lost connection all come back as a
/// [`Reply`] tagged `e`. Check [`error()`](Self::error) or
/// [`Reply::is_error`]. `Err` is reserved for payloads that do not match
/// their type tag, float arguments that are not finite, and
/// [`invoke`](Self::invoke) failures.
///
/// A reply that arrives after its command gave up is discarded, so the next
/// command still gets its own reply.
///
/// # Cleanup
///
/// Call [`cleanup`](Self::cleanup) when done. It is safe to call more than
/// once.
pub struct Session {
    process: EngineProcess,
    banner: EngineBanner,
    read_timeout: Duration,
    shutdown_grace: Duration,
    current_command: Option<String>,
    current_type: Option<TypeTag>,
    store: TypedValueStore,
    type_overrides: HashMap<String, TypeTag>,
}

impl Session {
    /// Spawn the engine and wait for its first prompt.
    ///
    /// The child is killed if the handshake fails.
    pub async fn start(config: SessionConfig) -> Result<Self> {
        let process = EngineProcess::spawn(&config)?;
        Self::connect(process, config).await
    }

    /// Run the startup handshake over an existing engine process.
    pub async fn connect(mut process: EngineProcess, config: SessionConfig) -> Result<Self> {
        let banner = match process.handshake(config.startup_timeout()).await {
            Ok(banner) => banner,
            Err(e) => {
                if let Err(cleanup_err) = process.cleanup(config.shutdown_grace()).await {
                    tracing::debug!("cleanup after failed start: {}", cleanup_err);
                }
                return Err(e);
            }
        };

        Ok(Self {
            process,
            banner,
            read_timeout: config.read_timeout(),
            shutdown_grace: config.shutdown_grace(),
            current_command: None,
            current_type: None,
            store: TypedValueStore::new(),
            type_overrides: config.type_overrides,
        })
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Send one command and wait for its reply.
    ///
    /// Surrounding whitespace is trimmed. An empty command sends nothing,
    /// changes nothing and returns `Ok(None)`.
    pub async fn command(&mut self, text: &str) -> Result<Option<Reply>> {
        let command = text.trim();
        if command.is_empty() {
            return Ok(None);
        }
        self.exchange(command, Outgoing::Plain).await.map(Some)
    }

    /// Send a command with a trailing float argument.
    ///
    /// With `None` the command goes out bare. Zero is a real argument and is
    /// sent like any other value. NaN and infinities are rejected with
    /// [`Error::InvalidFloatArgument`] before anything is written.
    pub async fn command_with_float_arg(
        &mut self,
        text: &str,
        arg: Option<f64>,
    ) -> Result<Option<Reply>> {
        let command = text.trim();
        if command.is_empty() {
            return Ok(None);
        }
        if let Some(value) = arg.filter(|v| !v.is_finite()) {
            return Err(Error::InvalidFloatArgument {
                command: command.to_string(),
                value,
            });
        }
        self.exchange(command, Outgoing::WithFloat(arg)).await.map(Some)
    }

    /// Run one command or a newline-separated batch and fail on engine errors.
    ///
    /// A batch stops at the first line that returns an error; later lines are
    /// never sent. On success a batch returns an `s` reply holding each
    /// line's value, one per line.
    pub async fn invoke(&mut self, text: &str, arg: Option<f64>) -> Result<Reply> {
        let reply = if arg.is_some() {
            self.command_with_float_arg(text, arg).await?
        } else if text.trim().contains('\n') {
            Some(self.run_batch(text).await?)
        } else {
            self.command(text).await?
        };

        match reply {
            Some(reply) if reply.is_error() => Err(Error::CommandFailed { reply }),
            Some(reply) => Ok(reply),
            None => Ok(Reply::text("")),
        }
    }

    async fn run_batch(&mut self, text: &str) -> Result<Reply> {
        let mut results = Vec::new();
        for line in text.lines() {
            let Some(reply) = self.command(line).await? else {
                continue;
            };
            if reply.is_error() {
                tracing::debug!("batch stopped at '{}'", line.trim());
                return Ok(reply);
            }
            results.push(reply.value.to_string());
        }
        Ok(Reply::text(results.join("\n")))
    }

    async fn exchange(&mut self, command: &str, outgoing: Outgoing) -> Result<Reply> {
        tracing::debug!("command: {}", command);
        self.current_command = Some(command.to_string());

        let (tag, payload) = match self.round_trip(command, outgoing).await {
            Some(bytes) => {
                tracing::trace!("<- {:?}", String::from_utf8_lossy(&bytes));
                let raw = grammar::parse_response(&bytes);
                (TypeTag::from(raw.tag), raw.payload)
            }
            None => {
                tracing::warn!("no reply to '{}': {}", command, CONNECTION_LOST);
                (TypeTag::Error, CONNECTION_LOST.to_string())
            }
        };

        self.record(command, tag, &payload)
    }

    /// Write the command and read up to the next prompt. `None` means the
    /// connection is gone.
    async fn round_trip(&mut self, command: &str, outgoing: Outgoing) -> Option<Vec<u8>> {
        if self.process.is_closed() {
            return None;
        }

        let written = match outgoing {
            Outgoing::Plain => self.process.send(command).await,
            Outgoing::WithFloat(arg) => self.process.send_float(command, arg).await,
        };
        if let Err(e) = written {
            tracing::debug!("write failed: {}", e);
            return None;
        }

        match self.process.read_response(self.read_timeout).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("read failed: {}", e);
                None
            }
        }
    }

    /// Apply any override, coerce, and store the value.
    ///
    /// The current type always follows this command. A payload that does not
    /// coerce leaves the stored value for its tag as it was.
    fn record(&mut self, command: &str, tag: TypeTag, payload: &str) -> Result<Reply> {
        let tag = match self.type_overrides.get(command) {
            Some(forced) => forced.clone(),
            None => tag,
        };
        self.current_type = Some(tag.clone());
        let value = self.store.record(&tag, payload)?;
        Ok(Reply::new(tag, value))
    }

    // -------------------------------------------------------------------------
    // Last values
    // -------------------------------------------------------------------------

    /// Whether the last command returned an error.
    pub fn error(&self) -> bool {
        self.current_type == Some(TypeTag::Error)
    }

    /// Message of the last error, or `""` if the last command succeeded.
    pub fn last_error(&self) -> &str {
        if self.error() {
            self.store.text(&TypeTag::Error).unwrap_or_default()
        } else {
            ""
        }
    }

    /// Last `f` value.
    pub fn last_float(&self) -> Option<f64> {
        self.store.float()
    }

    /// Last `i` value. Booleans come back this way too.
    pub fn last_integer(&self) -> Option<i32> {
        self.store.integer()
    }

    /// Last `li` value, used for sample and byte counts.
    pub fn last_long_integer(&self) -> Option<i64> {
        self.store.long_integer()
    }

    /// Last `s` value.
    pub fn last_string(&self) -> Option<&str> {
        self.store.text(&TypeTag::String)
    }

    /// Last `S` value, split on commas.
    pub fn last_string_list(&self) -> Option<&[String]> {
        self.store.list(&TypeTag::StringList)
    }

    /// Number of items in the last string list (0 if there is none).
    pub fn last_string_list_count(&self) -> usize {
        self.last_string_list().map_or(0, <[String]>::len)
    }

    /// Item `n` of the last string list.
    pub fn last_string_list_item(&self, n: usize) -> Option<&str> {
        self.last_string_list()?.get(n).map(String::as_str)
    }

    /// Tag of the last reply, after overrides.
    pub fn last_type(&self) -> Option<&TypeTag> {
        self.current_type.as_ref()
    }

    /// The last non-empty command sent, as trimmed.
    pub fn last_command(&self) -> Option<&str> {
        self.current_command.as_deref()
    }

    // -------------------------------------------------------------------------
    // Type overrides
    // -------------------------------------------------------------------------

    /// Reinterpret future replies to exactly `command` under `tag`.
    pub fn set_type_override(&mut self, command: impl Into<String>, tag: impl Into<TypeTag>) {
        self.type_overrides.insert(command.into(), tag.into());
    }

    /// Stop overriding `command`, returning the tag it was forced to.
    pub fn clear_type_override(&mut self, command: &str) -> Option<TypeTag> {
        self.type_overrides.remove(command)
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Engine events are not supported; always `None`.
    pub fn current_event(&self) -> Option<String> {
        None
    }

    /// Always `false`.
    pub fn events_available(&self) -> bool {
        false
    }

    /// Does nothing.
    pub fn next_event(&mut self) {}

    // -------------------------------------------------------------------------
    // Engine
    // -------------------------------------------------------------------------

    /// The startup banner.
    pub fn banner(&self) -> &str {
        &self.banner.text
    }

    /// Engine version from the banner, e.g. `2.9.3`.
    pub fn version(&self) -> &str {
        &self.banner.version
    }

    /// Process ID of the engine, if this session spawned one.
    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }

    /// Shut the engine down.
    ///
    /// Commands sent after cleanup return the connection-lost error reply.
    pub async fn cleanup(&mut self) -> Result<Option<ExitStatus>> {
        self.process.cleanup(self.shutdown_grace).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("version", &self.banner.version)
            .field("pid", &self.process.pid())
            .field("current_command", &self.current_command)
            .field("current_type", &self.current_type)
            .finish_non_exhaustive()
    }
}
