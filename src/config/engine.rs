//! Locating the engine executable.
//!
//! The executable is chosen in this order:
//!
//! 1. A path set explicitly on the builder
//! 2. The `ECASOUND` environment variable, if set and non-empty
//! 3. [`DEFAULT_ENGINE`], resolved through `PATH` at spawn time

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the engine executable.
pub const ENV_ENGINE: &str = "ECASOUND";

/// Engine executable used when nothing else is configured.
pub const DEFAULT_ENGINE: &str = "ecasound";

/// Resolve the engine executable against the current environment.
pub(crate) fn resolve_engine(explicit: Option<&Path>) -> PathBuf {
    resolve_engine_with(explicit, std::env::var_os(ENV_ENGINE))
}

fn resolve_engine_with(explicit: Option<&Path>, env_value: Option<OsString>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    match env_value {
        Some(value) if !value.is_empty() => {
            tracing::debug!("using engine from {}: {:?}", ENV_ENGINE, value);
            PathBuf::from(value)
        }
        _ => PathBuf::from(DEFAULT_ENGINE),
    }
}
