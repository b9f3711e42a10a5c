//! Process management for the engine.
//!
//! This module handles spawning the engine in interactive mode and talking
//! to it over its standard streams. One [`EngineProcess`] is one child.
//!
//! # Architecture
//!
//! ```text
//! ecacontrol                          ecasound -c
//! ┌──────────────┐                   ┌─────────────┐
//! │ EngineProcess│──stdin (cmd\r)───▶│             │
//! │              │◀─stdout (256 ..)──│             │
//! └──────────────┘                   └─────────────┘
//! ```
//!
//! # Input Protocol
//!
//! - Plain commands end with `\r`
//! - Commands carrying a float argument end with `\n`
//!
//! # Output Protocol
//!
//! Every reply ends with the next prompt. [`PipeReader`] collects bytes until
//! that prompt shows up and hands them to the
//! [`grammar`](crate::protocol::grammar).

mod io;
mod spawn;

pub use io::{CommandWriter, PipeReader};
pub use spawn::{EngineBanner, EngineProcess};

/// Oldest engine release with well-formed output mode.
pub const MIN_ENGINE_VERSION: &str = "2.2";

/// Command that asks the engine to exit.
pub const QUIT_COMMAND: &str = "quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineProcess>();
        assert_send_sync::<PipeReader>();
        assert_send_sync::<CommandWriter>();
        assert_send_sync::<EngineBanner>();
    }
}
