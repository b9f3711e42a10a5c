//! Last-seen value per type tag.

use std::collections::HashMap;

use super::value::{TypeTag, Value};
use crate::Result;

/// Most recent value for each type tag.
///
/// This is not a log: a reply overwrites the previous value with the same
/// tag, and values for other tags stay as they were. Only the value for the
/// current tag is fresh, so check the session's `last_type()` first.
#[derive(Debug, Clone, Default)]
pub struct TypedValueStore {
    values: HashMap<TypeTag, Value>,
}

impl TypedValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce `payload` under `tag` and remember it.
    ///
    /// On a coercion error the previous value for `tag` is left untouched.
    pub fn record(&mut self, tag: &TypeTag, payload: &str) -> Result<Value> {
        let value = tag.coerce(payload)?;
        self.values.insert(tag.clone(), value.clone());
        Ok(value)
    }

    /// Last value recorded under `tag`.
    pub fn get(&self, tag: &TypeTag) -> Option<&Value> {
        self.values.get(tag)
    }

    /// Last value under `tag`, if it is text.
    pub fn text(&self, tag: &TypeTag) -> Option<&str> {
        self.get(tag).and_then(Value::as_text)
    }

    /// Last value under `tag`, if it is a list.
    pub fn list(&self, tag: &TypeTag) -> Option<&[String]> {
        self.get(tag).and_then(Value::as_list)
    }

    /// Last `f` value.
    pub fn float(&self) -> Option<f64> {
        self.get(&TypeTag::Float).and_then(Value::as_float)
    }

    /// Last `i` value.
    pub fn integer(&self) -> Option<i32> {
        self.get(&TypeTag::Integer).and_then(Value::as_integer)
    }

    /// Last `li` value.
    pub fn long_integer(&self) -> Option<i64> {
        self.get(&TypeTag::LongInteger).and_then(Value::as_long_integer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_overwrites_same_tag() {
        let mut store = TypedValueStore::new();
        store.record(&TypeTag::Integer, "1").unwrap();
        store.record(&TypeTag::Integer, "2").unwrap();
        assert_eq!(store.integer(), Some(2));
    }

    #[test]
    fn stale_tags_keep_last_value() {
        let mut store = TypedValueStore::new();
        store.record(&TypeTag::Float, "0.25").unwrap();
        store.record(&TypeTag::String, "playing").unwrap();
        assert_eq!(store.float(), Some(0.25));
        assert_eq!(store.text(&TypeTag::String), Some("playing"));
    }

    #[test]
    fn failed_coercion_keeps_previous_value() {
        let mut store = TypedValueStore::new();
        store.record(&TypeTag::LongInteger, "44100").unwrap();
        assert!(store.record(&TypeTag::LongInteger, "lots").is_err());
        assert_eq!(store.long_integer(), Some(44100));
    }

    #[test]
    fn lists_by_tag() {
        let mut store = TypedValueStore::new();
        store.record(&TypeTag::StringList, "a,b").unwrap();
        store.record(&TypeTag::NewlineList, "c\nd").unwrap();
        assert_eq!(store.list(&TypeTag::StringList).unwrap(), ["a", "b"]);
        assert_eq!(store.list(&TypeTag::NewlineList).unwrap(), ["c", "d"]);
        assert!(store.get(&TypeTag::Error).is_none());
    }
}
