//! Structured parse result.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

/// Destination-keyed values produced by a successful parse.
///
/// Every destination declared on the root parser and on the selected
/// command is present; unsupplied ones carry their default. The subcommand
/// destination holds the selected command name (or `null`).
///
/// # Examples
///
/// ```
/// use command_spec_compiler::ParsedArgs;
/// use serde_json::json;
///
/// let args: ParsedArgs = [
///     ("command", json!("load")),
///     ("limit", json!(1000)),
///     ("entry_path", json!(["a", "b"])),
///     ("force", json!(false)),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(args.command("command"), Some("load"));
/// assert_eq!(args.get_i64("limit"), Some(1000));
/// assert_eq!(args.get_strings("entry_path"), Some(vec!["a", "b"]));
/// assert_eq!(args.get_bool("force"), Some(false));
/// assert!(args.get("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParsedArgs {
    values: BTreeMap<String, Value>,
}

impl ParsedArgs {
    pub(crate) fn insert(&mut self, dest: &str, value: Value) {
        self.values.insert(dest.to_string(), value);
    }

    /// Raw value of a destination.
    pub fn get(&self, dest: &str) -> Option<&Value> {
        self.values.get(dest)
    }

    /// Returns `true` if the destination was declared.
    pub fn contains(&self, dest: &str) -> bool {
        self.values.contains_key(dest)
    }

    /// String value; `None` when absent, null, or not a string.
    pub fn get_str(&self, dest: &str) -> Option<&str> {
        self.get(dest).and_then(Value::as_str)
    }

    /// Boolean value.
    pub fn get_bool(&self, dest: &str) -> Option<bool> {
        self.get(dest).and_then(Value::as_bool)
    }

    /// Integer value.
    pub fn get_i64(&self, dest: &str) -> Option<i64> {
        self.get(dest).and_then(Value::as_i64)
    }

    /// Float value (integers widen).
    pub fn get_f64(&self, dest: &str) -> Option<f64> {
        self.get(dest).and_then(Value::as_f64)
    }

    /// Path value.
    pub fn get_path(&self, dest: &str) -> Option<&Path> {
        self.get_str(dest).map(Path::new)
    }

    /// List of strings; `None` if any element is not a string.
    pub fn get_strings(&self, dest: &str) -> Option<Vec<&str>> {
        self.get(dest)?.as_array()?.iter().map(Value::as_str).collect()
    }

    /// Name of the selected command recorded under `dest`.
    pub fn command(&self, dest: &str) -> Option<&str> {
        self.get_str(dest)
    }

    /// Number of destinations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Destinations and values, ordered by destination.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(dest, value)| (dest.as_str(), value))
    }

    /// Consumes the result, returning the underlying map.
    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.values
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ParsedArgs {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_getters_reject_wrong_types() {
        let mut args = ParsedArgs::default();
        args.insert("limit", json!("ten"));
        args.insert("target", Value::Null);
        assert_eq!(args.get_i64("limit"), None);
        assert_eq!(args.get_str("target"), None);
        assert!(args.contains("target"));
    }

    #[test]
    fn test_mixed_list_is_not_strings() {
        let mut args = ParsedArgs::default();
        args.insert("items", json!(["a", 1]));
        assert_eq!(args.get_strings("items"), None);
    }

    #[test]
    fn test_path_and_float() {
        let mut args = ParsedArgs::default();
        args.insert("config_file", json!("/etc/oil.yml"));
        args.insert("ratio", json!(2));
        assert_eq!(args.get_path("config_file"), Some(Path::new("/etc/oil.yml")));
        assert_eq!(args.get_f64("ratio"), Some(2.0));
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let mut args = ParsedArgs::default();
        args.insert("verbose", json!(true));
        args.insert("command", json!("init"));
        assert_eq!(
            serde_json::to_string(&args).unwrap(),
            r#"{"command":"init","verbose":true}"#
        );
    }
}
