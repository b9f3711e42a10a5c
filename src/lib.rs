//! # ecacontrol
//!
//! Async Rust client for the ecasound interactive control interface.
//!
//! The engine runs as a child process in `-c` mode with well-formed output.
//! This library provides:
//! - Spawning, version checking and shutdown of the engine
//! - Framing and typed decoding of its replies
//! - A [`Session`] that remembers the last value of every type
//! - A [`CommandFacade`] that calls engine commands by name
//!
//! ## Quick Start
//!
//! ```no_run
//! use ecacontrol::{Result, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut session = Session::start(SessionConfig::builder().build()?).await?;
//!
//!     session.invoke("cs-add play_chainsetup\nc-add 1st_chain", None).await?;
//!     session.command("c-list").await?;
//!     println!("{:?}", session.last_string_list());
//!
//!     session.cleanup().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Engine errors are replies, not `Err`:
//!
//! ```no_run
//! # async fn example(session: &mut ecacontrol::Session) -> ecacontrol::Result<()> {
//! if let Some(reply) = session.command("cs-connect").await? {
//!     if reply.is_error() {
//!         eprintln!("engine said: {}", session.last_error());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```no_run
//! use std::time::Duration;
//! use ecacontrol::{SessionConfig, TypeTag};
//!
//! let config = SessionConfig::builder()
//!     .engine_path("/usr/local/bin/ecasound")
//!     .read_timeout(Duration::from_secs(2))
//!     .type_override("cs-status", TypeTag::String)
//!     .build()?;
//! # Ok::<(), ecacontrol::Error>(())
//! ```

pub mod config;
mod error;
pub mod facade;
pub mod process;
pub mod protocol;
mod session;

pub use error::{Error, Result};

// Re-export the main session types at crate root
pub use facade::{Arity, CommandDescriptor, CommandFacade};
pub use session::{Session, CONNECTION_LOST};

// Re-export commonly used config types at crate root
pub use config::{SessionConfig, SessionConfigBuilder};

// Re-export commonly used protocol types at crate root
pub use protocol::{RawResponse, Reply, TypeTag, TypedValueStore, Value};

// Re-export commonly used process types at crate root
pub use process::{EngineBanner, EngineProcess};
