//! Wire protocol of the engine's interactive mode.
//!
//! This module defines how replies are framed on the engine's stdout and how
//! their payloads become typed values.
//!
//! # Reply format
//!
//! ```text
//! 256 <decimal-length> <type-token>\r\n<payload>\r\n\r\n<next-prompt-text>
//! ```
//!
//! - [`grammar`]: locates and validates the payload of a reply
//! - [`TypeTag`] / [`Value`]: type tokens and their coercions
//! - [`TypedValueStore`]: the last value seen for each tag
//!
//! # Example
//!
//! ```
//! use ecacontrol::protocol::{grammar, TypeTag, Value};
//!
//! let blob = b"256 8 S\r\n12,ao,34\r\n\r\necasound ('h' for help)> ";
//! let response = grammar::parse_response(blob);
//! let value = TypeTag::from(response.tag.as_str()).coerce(&response.payload).unwrap();
//! assert_eq!(value, Value::List(vec!["12".into(), "ao".into(), "34".into()]));
//! ```

pub mod grammar;
mod store;
mod value;

pub use grammar::{parse_response, RawResponse};
pub use store::TypedValueStore;
pub use value::{Reply, TypeTag, Value};

/// Suffix of the engine's prompt, which terminates every reply.
pub const PROMPT_SUFFIX: &[u8] = b"> ";
