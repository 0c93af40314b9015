//! Transparent JSON-string decoding for spec sequences.
//!
//! Every sequence in a schema (options, groups, mutex groups, parent
//! parsers, commands) may be written as a JSON array, as `null`, or as a
//! string holding a JSON array. [`SpecSeq`] carries the same three forms
//! into builder functions; the serde helper [`seq_or_json`] accepts them
//! inside a schema document.
//!
//! # Examples
//!
//! ```
//! use command_spec_core::{OptionSpec, SpecSeq};
//!
//! let from_json: SpecSeq<OptionSpec> = r#"[{"flags": ["--verbose"], "action": "store_true"}]"#.into();
//! let options = from_json.decode().unwrap();
//! assert_eq!(options[0].flags, vec!["--verbose"]);
//!
//! let empty: SpecSeq<OptionSpec> = SpecSeq::default();
//! assert!(empty.decode().unwrap().is_empty());
//! ```

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::Result;

/// A spec sequence in any accepted input form.
#[derive(Debug, Clone)]
pub enum SpecSeq<'a, T: Clone> {
    /// Already-decoded items.
    Items(Cow<'a, [T]>),
    /// A JSON document holding an array of items.
    Json(Cow<'a, str>),
    /// A raw JSON value (array, string holding an array, or null).
    Value(Value),
}

impl<T: Clone> Default for SpecSeq<'_, T> {
    fn default() -> Self {
        SpecSeq::Items(Cow::Owned(Vec::new()))
    }
}

impl<'a, T: Clone + DeserializeOwned> SpecSeq<'a, T> {
    /// Decodes the sequence into borrowed or owned items.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Decode`](crate::SchemaError::Decode) if a JSON
    /// form does not hold an array of `T`.
    pub fn decode(self) -> Result<Cow<'a, [T]>> {
        match self {
            SpecSeq::Items(items) => Ok(items),
            SpecSeq::Json(raw) => Ok(Cow::Owned(serde_json::from_str(&raw)?)),
            SpecSeq::Value(value) => Ok(Cow::Owned(from_value_or_json(value)?)),
        }
    }
}

impl<T: Clone> From<Vec<T>> for SpecSeq<'_, T> {
    fn from(items: Vec<T>) -> Self {
        SpecSeq::Items(Cow::Owned(items))
    }
}

impl<'a, T: Clone> From<&'a [T]> for SpecSeq<'a, T> {
    fn from(items: &'a [T]) -> Self {
        SpecSeq::Items(Cow::Borrowed(items))
    }
}

impl<'a, T: Clone> From<&'a Vec<T>> for SpecSeq<'a, T> {
    fn from(items: &'a Vec<T>) -> Self {
        SpecSeq::Items(Cow::Borrowed(items.as_slice()))
    }
}

impl<'a, T: Clone> From<&'a str> for SpecSeq<'a, T> {
    fn from(raw: &'a str) -> Self {
        SpecSeq::Json(Cow::Borrowed(raw))
    }
}

impl<T: Clone> From<String> for SpecSeq<'_, T> {
    fn from(raw: String) -> Self {
        SpecSeq::Json(Cow::Owned(raw))
    }
}

impl<T: Clone> From<Value> for SpecSeq<'_, T> {
    fn from(value: Value) -> Self {
        SpecSeq::Value(value)
    }
}

impl<T: Clone> From<Option<Vec<T>>> for SpecSeq<'_, T> {
    fn from(items: Option<Vec<T>>) -> Self {
        items.map(SpecSeq::from).unwrap_or_default()
    }
}

fn from_value_or_json<T: DeserializeOwned>(value: Value) -> serde_json::Result<Vec<T>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(raw) => serde_json::from_str(&raw),
        other => serde_json::from_value(other),
    }
}

/// Deserializes a sequence written as an array, `null`, or a JSON string.
///
/// Used as `#[serde(default, deserialize_with = "seq_or_json")]` on every
/// sequence field of the schema model.
pub fn seq_or_json<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    from_value_or_json(value).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::OptionSpec;

    #[test]
    fn test_decode_borrowed_items_does_not_copy() {
        let options = vec![OptionSpec::new(["--dry-run"])];
        let seq: SpecSeq<OptionSpec> = (&options).into();
        let decoded = seq.decode().unwrap();
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn test_decode_json_string_value() {
        let seq: SpecSeq<OptionSpec> = json!(r#"[{"flag": ["-x"]}]"#).into();
        let decoded = seq.decode().unwrap();
        assert_eq!(decoded[0].flags, vec!["-x"]);
    }

    #[test]
    fn test_decode_null_value_is_empty() {
        let seq: SpecSeq<OptionSpec> = Value::Null.into();
        assert!(seq.decode().unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_non_array_json() {
        let seq: SpecSeq<OptionSpec> = r#"{"flags": ["-x"]}"#.into();
        assert!(seq.decode().is_err());
    }
}
