//! Closed registry of value converters.
//!
//! An option's `type` descriptor is looked up by name in a [`TypeRegistry`];
//! descriptors are never evaluated. The built-in vocabulary covers strings,
//! integers, floats, paths, and booleans. Hosts may register more named
//! converters before compiling.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Number, Value};

type ConvertFn = dyn Fn(&str) -> Result<Value, String> + Send + Sync;

/// A named conversion from raw argument text to a typed value.
#[derive(Clone)]
pub struct Converter {
    name: Arc<str>,
    numeric: bool,
    func: Arc<ConvertFn>,
}

impl Converter {
    /// Wraps a conversion function.
    ///
    /// `numeric` converters also accept tokens that look like negative
    /// numbers (`-5`) as values rather than switches.
    pub fn new<F>(name: &str, numeric: bool, func: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            numeric,
            func: Arc::new(func),
        }
    }

    /// Identity conversion used when no type is declared.
    pub fn string() -> Self {
        Self::new("str", false, |raw| Ok(Value::String(raw.to_string())))
    }

    /// Name the converter was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` for number-producing converters.
    pub fn is_numeric(&self) -> bool {
        self.numeric
    }

    /// Converts one raw value.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when `raw` is not a valid value.
    pub fn convert(&self, raw: &str) -> Result<Value, String> {
        (self.func)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("numeric", &self.numeric)
            .finish_non_exhaustive()
    }
}

/// Type descriptor vocabulary.
///
/// # Examples
///
/// ```
/// use command_spec_compiler::TypeRegistry;
/// use serde_json::json;
///
/// let types = TypeRegistry::builtin();
/// let int = types.resolve("int").unwrap();
/// assert_eq!(int.convert("37").unwrap(), json!(37));
/// assert!(int.convert("thirty").is_err());
/// assert!(types.resolve("__import__('os')").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    converters: HashMap<String, Converter>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TypeRegistry {
    /// Registry with no converters at all.
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Registry with the built-in vocabulary: `str`/`string`,
    /// `int`/`integer`, `float`, `path`, `bool`/`boolean`.
    pub fn builtin() -> Self {
        let string = Converter::string();
        let integer = Converter::new("int", true, parse_integer);
        let boolean = Converter::new("bool", false, parse_bool);

        Self::empty()
            .with("str", string.clone())
            .with("string", string)
            .with("int", integer.clone())
            .with("integer", integer)
            .with("float", Converter::new("float", true, parse_float))
            .with("path", Converter::new("path", false, parse_path))
            .with("bool", boolean.clone())
            .with("boolean", boolean)
    }

    /// Adds (or replaces) a named converter, builder style.
    pub fn with(mut self, name: &str, converter: Converter) -> Self {
        self.register(name, converter);
        self
    }

    /// Adds (or replaces) a named converter.
    pub fn register(&mut self, name: &str, converter: Converter) -> &mut Self {
        self.converters.insert(name.to_string(), converter);
        self
    }

    /// Looks up a descriptor.
    pub fn resolve(&self, descriptor: &str) -> Option<&Converter> {
        self.converters.get(descriptor)
    }

    /// Registered descriptor names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.converters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn parse_integer(raw: &str) -> Result<Value, String> {
    raw.trim()
        .parse::<i64>()
        .map(Value::from)
        .map_err(|_| format!("invalid int value: '{raw}'"))
}

fn parse_float(raw: &str) -> Result<Value, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("invalid float value: '{raw}'"))
}

fn parse_path(raw: &str) -> Result<Value, String> {
    if raw.is_empty() {
        return Err("invalid path value: ''".to_string());
    }
    Ok(Value::String(raw.to_string()))
}

fn parse_bool(raw: &str) -> Result<Value, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
        "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
        _ => Err(format!("invalid bool value: '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_builtin_names() {
        let types = TypeRegistry::builtin();
        assert_eq!(
            types.names(),
            vec!["bool", "boolean", "float", "int", "integer", "path", "str", "string"]
        );
    }

    #[test]
    fn test_integer_accepts_negative() {
        let types = TypeRegistry::builtin();
        assert_eq!(types.resolve("integer").unwrap().convert("-4").unwrap(), json!(-4));
    }

    #[test]
    fn test_float_rejects_nan() {
        let types = TypeRegistry::builtin();
        assert!(types.resolve("float").unwrap().convert("NaN").is_err());
        assert_eq!(types.resolve("float").unwrap().convert("1.5").unwrap(), json!(1.5));
    }

    #[test]
    fn test_bool_spellings() {
        let conv = TypeRegistry::builtin().resolve("bool").cloned().unwrap();
        assert_eq!(conv.convert("Yes").unwrap(), json!(true));
        assert_eq!(conv.convert("0").unwrap(), json!(false));
        assert!(conv.convert("maybe").is_err());
    }

    #[test]
    fn test_register_custom_converter() {
        let mut types = TypeRegistry::empty();
        types.register(
            "upper",
            Converter::new("upper", false, |raw| Ok(Value::String(raw.to_uppercase()))),
        );
        assert_eq!(types.resolve("upper").unwrap().convert("abc").unwrap(), json!("ABC"));
        assert!(types.resolve("int").is_none());
    }

    #[test]
    fn test_numeric_flag() {
        let types = TypeRegistry::builtin();
        assert!(types.resolve("int").unwrap().is_numeric());
        assert!(!types.resolve("path").unwrap().is_numeric());
    }
}
