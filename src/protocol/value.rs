//! Type tags and the typed values they coerce to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Type tag of an engine reply, with an escape hatch for unlisted tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TypeTag {
    /// `s`: a single string.
    String,
    /// `S`: comma-separated list of strings.
    StringList,
    /// `Sn`: newline-separated list of strings.
    NewlineList,
    /// `f`: floating point number.
    Float,
    /// `i`: integer, also used for booleans.
    Integer,
    /// `li`: long integer, used for sample and byte counts.
    LongInteger,
    /// `e`: error message.
    Error,
    /// Any other token, passed through verbatim.
    Other(String),
}

impl TypeTag {
    /// The wire token for this tag.
    pub fn as_str(&self) -> &str {
        match self {
            TypeTag::String => "s",
            TypeTag::StringList => "S",
            TypeTag::NewlineList => "Sn",
            TypeTag::Float => "f",
            TypeTag::Integer => "i",
            TypeTag::LongInteger => "li",
            TypeTag::Error => "e",
            TypeTag::Other(token) => token,
        }
    }

    /// Coerce a raw payload to the native value for this tag.
    ///
    /// List tags split on their separator, numeric tags parse the trimmed
    /// payload, and everything else keeps the payload as text. A numeric
    /// payload that does not parse is a protocol contract violation.
    pub fn coerce(&self, payload: &str) -> Result<Value> {
        let value = match self {
            TypeTag::StringList => Value::List(payload.split(',').map(str::to_string).collect()),
            TypeTag::NewlineList => Value::List(payload.split('\n').map(str::to_string).collect()),
            TypeTag::Float => Value::Float(self.parse_number(payload)?),
            TypeTag::Integer => Value::Integer(self.parse_number(payload)?),
            TypeTag::LongInteger => Value::LongInteger(self.parse_number(payload)?),
            _ => Value::Text(payload.to_string()),
        };
        Ok(value)
    }

    fn parse_number<T: std::str::FromStr>(&self, payload: &str) -> Result<T> {
        payload.trim().parse().map_err(|_| Error::Coercion {
            tag: self.clone(),
            payload: payload.to_string(),
        })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TypeTag {
    fn from(s: &str) -> Self {
        match s {
            "s" => TypeTag::String,
            "S" => TypeTag::StringList,
            "Sn" => TypeTag::NewlineList,
            "f" => TypeTag::Float,
            "i" => TypeTag::Integer,
            "li" => TypeTag::LongInteger,
            "e" => TypeTag::Error,
            other => TypeTag::Other(other.to_string()),
        }
    }
}

impl From<String> for TypeTag {
    fn from(s: String) -> Self {
        TypeTag::from(s.as_str())
    }
}

impl From<TypeTag> for String {
    fn from(tag: TypeTag) -> Self {
        tag.as_str().to_string()
    }
}

/// A coerced reply value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    List(Vec<String>),
    Float(f64),
    Integer(i32),
    LongInteger(i64),
}

impl Value {
    /// The text of an `s`, `e` or pass-through value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The items of an `S` or `Sn` value.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The number of an `f` value.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The number of an `i` value.
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// The number of an `li` value.
    pub fn as_long_integer(&self) -> Option<i64> {
        match self {
            Value::LongInteger(v) => Some(*v),
            _ => None,
        }
    }
}

/// Lists render comma-joined, the same way the engine sends `S` payloads.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::List(items) => f.write_str(&items.join(",")),
            Value::Float(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::LongInteger(v) => write!(f, "{}", v),
        }
    }
}

/// The outcome of one command: the effective type tag and its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub tag: TypeTag,
    pub value: Value,
}

impl Reply {
    /// Create a reply from a tag and an already coerced value.
    pub fn new(tag: TypeTag, value: Value) -> Self {
        Self { tag, value }
    }

    /// An `e` reply with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(TypeTag::Error, Value::Text(message.into()))
    }

    /// An `s` reply with the given text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(TypeTag::String, Value::Text(text.into()))
    }

    /// Check if the engine reported an error.
    pub fn is_error(&self) -> bool {
        self.tag == TypeTag::Error
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
