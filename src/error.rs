use crate::protocol::{Reply, TypeTag};

/// Errors that can occur when driving the engine.
///
/// Errors are organized by category:
/// - Configuration errors: detected at `build()` time
/// - Startup errors: the engine could not be launched or is unusable
/// - Protocol contract errors: a payload does not match its type tag
/// - Command errors: an invoked command reported failure
///
/// Framing errors and a lost connection are *not* represented here. They are
/// surfaced as [`Reply`] values tagged `e`, so callers check one place.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration errors (detected at build() time)
    // -------------------------------------------------------------------------
    /// Invalid configuration provided to builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -------------------------------------------------------------------------
    // Startup errors
    // -------------------------------------------------------------------------
    /// Engine executable not found.
    #[error("engine executable not found (searched: {searched})")]
    EngineNotFound { searched: String },

    /// Failed to spawn the engine subprocess.
    #[error("failed to spawn engine process: {0}")]
    ProcessSpawn(#[source] std::io::Error),

    /// The startup banner did not arrive or carried no version.
    #[error("could not read engine version from banner: {banner:?}")]
    BannerUnparsable { banner: String },

    /// The engine is older than the minimum supported version.
    #[error("engine version {found} is too old ({required}+ required)")]
    UnsupportedVersion { found: String, required: &'static str },

    // -------------------------------------------------------------------------
    // IO errors
    // -------------------------------------------------------------------------
    /// IO error communicating with the engine outside the command path.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol contract errors
    // -------------------------------------------------------------------------
    /// A payload could not be converted to the type its tag promises.
    #[error("payload {payload:?} is not a valid '{tag}' value")]
    Coercion { tag: TypeTag, payload: String },

    // -------------------------------------------------------------------------
    // Command errors
    // -------------------------------------------------------------------------
    /// A float argument the engine cannot parse (NaN or infinite).
    #[error("float argument for '{command}' must be finite, got {value}")]
    InvalidFloatArgument { command: String, value: f64 },

    /// An invoked command (or a line of a batch) returned an error reply.
    #[error("command failed: {reply}")]
    CommandFailed { reply: Reply },

    /// A command returned a reply of the wrong shape.
    #[error("unexpected reply to '{command}': {reply}")]
    UnexpectedReply { command: String, reply: Reply },

    /// No command with this name was reported by the engine.
    #[error("unknown engine command: {name}")]
    UnknownCommand { name: String },

    /// A command was called with the wrong number of arguments.
    #[error("command '{name}' takes {arity}")]
    ArgumentMismatch {
        name: String,
        arity: crate::facade::Arity,
    },
}

/// A specialized Result type for ecacontrol operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error.
    pub fn io(source: std::io::Error) -> Self {
        Self::Io(source)
    }

    /// Check if this error left the session unusable at startup.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            Error::EngineNotFound { .. }
                | Error::ProcessSpawn(_)
                | Error::BannerUnparsable { .. }
                | Error::UnsupportedVersion { .. }
        )
    }

    /// The reply carried by a command failure, if any.
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Error::CommandFailed { reply } | Error::UnexpectedReply { reply, .. } => Some(reply),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Value;

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }

    #[test]
    fn startup_error_detection() {
        assert!(Error::EngineNotFound {
            searched: "ecasound".into()
        }
        .is_startup_error());
        assert!(Error::BannerUnparsable {
            banner: String::new()
        }
        .is_startup_error());
        assert!(Error::UnsupportedVersion {
            found: "2.1".into(),
            required: "2.2"
        }
        .is_startup_error());
        assert!(!Error::Coercion {
            tag: TypeTag::Float,
            payload: "x".into()
        }
        .is_startup_error());
    }

    #[test]
    fn command_failed_carries_reply() {
        let reply = Reply::new(TypeTag::Error, Value::Text("no such chain".into()));
        let err = Error::CommandFailed {
            reply: reply.clone(),
        };
        assert_eq!(err.reply(), Some(&reply));
        assert!(err.to_string().contains("no such chain"));
    }

    #[test]
    fn coercion_message_names_tag() {
        let err = Error::Coercion {
            tag: TypeTag::LongInteger,
            payload: "abc".into(),
        };
        assert_eq!(err.to_string(), "payload \"abc\" is not a valid 'li' value");
    }

    #[test]
    fn invalid_float_message() {
        let err = Error::InvalidFloatArgument {
            command: "setpos".into(),
            value: f64::INFINITY,
        };
        assert_eq!(err.to_string(), "float argument for 'setpos' must be finite, got inf");
        assert!(!err.is_startup_error());
    }

    #[test]
    fn question_mark_operator_io() {
        fn fallible_io() -> Result<()> {
            let _file = std::fs::File::open("/nonexistent/path/that/does/not/exist")?;
            Ok(())
        }
        assert!(matches!(fallible_io(), Err(Error::Io(_))));
    }
}
