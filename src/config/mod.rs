//! Configuration for control sessions.
//!
//! This module provides:
//!
//! - [`SessionConfig`] and [`SessionConfigBuilder`] for configuring a session
//! - Engine executable resolution (`ECASOUND` override, `ecasound` default)
//! - Default timing constants
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ecacontrol::config::SessionConfig;
//!
//! let config = SessionConfig::builder()
//!     .read_timeout(Duration::from_millis(500))
//!     .shutdown_grace(Duration::from_secs(1))
//!     .build()
//!     .unwrap();
//! ```

pub mod builder;
pub mod engine;

pub use builder::{
    SessionConfig, SessionConfigBuilder, DEFAULT_READ_TIMEOUT, DEFAULT_SHUTDOWN_GRACE,
    DEFAULT_STARTUP_TIMEOUT,
};
pub use engine::{DEFAULT_ENGINE, ENV_ENGINE};
