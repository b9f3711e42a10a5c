//! Named access to every command the engine reports.
//!
//! [`CommandFacade`] asks the engine for its command list once, at
//! construction, and keeps an immutable table of [`CommandDescriptor`]s.
//! Commands can then be called by name, in either the engine form
//! (`cop-select`) or the identifier form (`cop_select`).
//!
//! # Example
//!
//! ```no_run
//! use ecacontrol::{CommandFacade, SessionConfig};
//!
//! # async fn example() -> ecacontrol::Result<()> {
//! let mut eca = CommandFacade::start(SessionConfig::builder().build()?).await?;
//!
//! eca.invoke_descriptor("cs_add", Some("play_chainsetup")).await?;
//! eca.invoke_descriptor("c_add", Some("1st_chain")).await?;
//! let chains = eca.invoke_descriptor("c_list", None).await?;
//! println!("{}", chains);
//!
//! eca.session_mut().cleanup().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::config::SessionConfig;
use crate::protocol::{Reply, Value};
use crate::session::Session;
use crate::{Error, Result};

/// Command that lists every command the engine knows.
const COMMAND_LIST: &str = "int-cmd-list";

/// How many arguments a command takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    NoArgument,
    StringArgument,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::NoArgument => f.write_str("no argument"),
            Arity::StringArgument => f.write_str("one string argument"),
        }
    }
}

/// One engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Name as the engine spells it, e.g. `cop-select`.
    pub name: String,
    pub arity: Arity,
}

impl CommandDescriptor {
    /// Build a descriptor for a name from the engine's command list.
    ///
    /// Commands that add or select something take one string argument.
    pub fn from_engine_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let arity = if name.contains("add") || name.contains("select") {
            Arity::StringArgument
        } else {
            Arity::NoArgument
        };
        Self { name, arity }
    }

    /// Name with `-` replaced by `_`, e.g. `cop_select`.
    pub fn identifier(&self) -> String {
        self.name.replace('-', "_")
    }

    /// The command line for this descriptor and argument.
    fn command_line(&self, arg: Option<&str>) -> Option<String> {
        match (self.arity, arg) {
            (Arity::NoArgument, None) => Some(self.name.clone()),
            (Arity::StringArgument, Some(arg)) => Some(format!("{} {}", self.name, arg)),
            _ => None,
        }
    }
}

/// A session plus a table of the engine's commands.
#[derive(Debug)]
pub struct CommandFacade {
    session: Session,
    commands: BTreeMap<String, CommandDescriptor>,
}

impl CommandFacade {
    /// Start a session and discover its commands.
    pub async fn start(config: SessionConfig) -> Result<Self> {
        Self::new(Session::start(config).await?).await
    }

    /// Discover the commands of an existing session.
    ///
    /// Fails with [`Error::UnexpectedReply`] if the engine does not answer
    /// with a string list.
    pub async fn new(mut session: Session) -> Result<Self> {
        let reply = session.invoke(COMMAND_LIST, None).await?;
        let names = match reply.value {
            Value::List(names) => names,
            _ => {
                return Err(Error::UnexpectedReply {
                    command: COMMAND_LIST.to_string(),
                    reply,
                })
            }
        };

        let commands: BTreeMap<_, _> = names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(|name| {
                let descriptor = CommandDescriptor::from_engine_name(name);
                (descriptor.identifier(), descriptor)
            })
            .collect();

        tracing::debug!("engine reported {} commands", commands.len());
        Ok(Self { session, commands })
    }

    /// Look up a command by engine name or identifier.
    pub fn descriptor(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(&name.replace('-', "_"))
    }

    /// All commands, ordered by identifier.
    pub fn commands(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values()
    }

    /// Call a command by name.
    ///
    /// `arg` must be present exactly when the command takes a string
    /// argument. Engine errors become [`Error::CommandFailed`].
    pub async fn invoke_descriptor(&mut self, name: &str, arg: Option<&str>) -> Result<Reply> {
        let descriptor = self
            .descriptor(name)
            .ok_or_else(|| Error::UnknownCommand {
                name: name.to_string(),
            })?;
        let line = descriptor
            .command_line(arg)
            .ok_or_else(|| Error::ArgumentMismatch {
                name: descriptor.name.clone(),
                arity: descriptor.arity,
            })?;

        self.session.invoke(&line, None).await
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The underlying session, for direct commands and cleanup.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Drop the command table and keep the session.
    pub fn into_session(self) -> Session {
        self.session
    }
}
