//! Entry declarations of the user's bundler configuration.
//!
//! An entry can be a single path, a list of paths, a map of named entries,
//! or (from Rust callers) a producer that is evaluated once to one of those
//! shapes. Everything normalizes to a map from entry name to imports.

use crate::error::ConfigError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;

/// Name used for unnamed entries.
pub const DEFAULT_ENTRY_NAME: &str = "main";

/// Producer of an entry value.
pub type EntryProducer = Arc<dyn Fn() -> Value + Send + Sync>;

/// A user-declared entry.
#[derive(Clone, Default)]
pub enum EntrySpec {
    /// No user entries
    #[default]
    None,
    /// One import under the default name
    Single(String),
    /// Several imports bundled together under the default name
    List(Vec<String>),
    /// Named entries, each one or more imports
    Named(IndexMap<String, Vec<String>>),
    /// Evaluated once at resolution time
    Computed(EntryProducer),
}

impl EntrySpec {
    /// Interprets a JSON value as an entry declaration.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedEntry` for numbers, booleans, nested objects and
    /// arrays that contain anything but strings.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        match value {
            Value::Null => Ok(EntrySpec::None),
            Value::String(import) => Ok(EntrySpec::Single(import.clone())),
            Value::Array(items) => string_list(items).map(EntrySpec::List),
            Value::Object(map) => {
                let mut named = IndexMap::with_capacity(map.len());
                for (name, value) in map {
                    let imports = match value {
                        Value::String(import) => vec![import.clone()],
                        Value::Array(items) => string_list(items)?,
                        other => return Err(unsupported(other)),
                    };
                    named.insert(name.clone(), imports);
                }
                Ok(EntrySpec::Named(named))
            }
            other => Err(unsupported(other)),
        }
    }

    /// Normalizes to entry name → imports.
    ///
    /// A producer is called exactly once and its value must itself be a
    /// plain (non-producer) entry shape.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedEntry` if a produced value has an invalid shape.
    pub fn resolve(&self) -> Result<IndexMap<String, Vec<String>>, ConfigError> {
        let mut entries = IndexMap::new();
        match self {
            EntrySpec::None => {}
            EntrySpec::Single(import) => {
                entries.insert(DEFAULT_ENTRY_NAME.to_string(), vec![import.clone()]);
            }
            EntrySpec::List(imports) => {
                entries.insert(DEFAULT_ENTRY_NAME.to_string(), imports.clone());
            }
            EntrySpec::Named(named) => entries.clone_from(named),
            EntrySpec::Computed(produce) => {
                return EntrySpec::from_value(&produce())?.resolve();
            }
        }
        entries.retain(|_, imports| !imports.is_empty());
        Ok(entries)
    }
}

fn string_list(items: &[Value]) -> Result<Vec<String>, ConfigError> {
    items
        .iter()
        .map(|item| match item {
            Value::String(import) => Ok(import.clone()),
            other => Err(unsupported(other)),
        })
        .collect()
}

fn unsupported(value: &Value) -> ConfigError {
    let found = match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "nested array".to_string(),
        Value::Object(_) => "nested object".to_string(),
    };
    ConfigError::UnsupportedEntry { found }
}

impl std::fmt::Debug for EntrySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntrySpec::None => f.write_str("None"),
            EntrySpec::Single(import) => f.debug_tuple("Single").field(import).finish(),
            EntrySpec::List(imports) => f.debug_tuple("List").field(imports).finish(),
            EntrySpec::Named(named) => f.debug_tuple("Named").field(named).finish(),
            EntrySpec::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for EntrySpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        EntrySpec::from_value(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_single_and_list_use_default_name() {
        let single = EntrySpec::from_value(&json!("./setup.js")).unwrap();
        let resolved = single.resolve().unwrap();
        assert_eq!(resolved["main"], vec!["./setup.js"]);

        let list = EntrySpec::from_value(&json!(["./a.js", "./b.js"])).unwrap();
        let resolved = list.resolve().unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["main"], vec!["./a.js", "./b.js"]);
    }

    #[test]
    fn test_named_preserves_order_and_mixed_values() {
        let spec = EntrySpec::from_value(&json!({
            "polyfills": "./polyfills.js",
            "fixtures": ["./a.json.js", "./b.json.js"]
        }))
        .unwrap();
        let resolved = spec.resolve().unwrap();
        let names: Vec<_> = resolved.keys().cloned().collect();
        assert_eq!(names, vec!["polyfills", "fixtures"]);
        assert_eq!(resolved["fixtures"].len(), 2);
    }

    #[test]
    fn test_rejects_unsupported_shapes() {
        for value in [json!(42), json!(true), json!([1]), json!({"a": {"b": "c"}})] {
            let err = EntrySpec::from_value(&value).unwrap_err();
            assert!(matches!(err, ConfigError::UnsupportedEntry { .. }), "{value}");
        }
    }

    #[test]
    fn test_computed_is_called_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let spec = EntrySpec::Computed(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            json!({ "setup": "./setup.js" })
        }));

        let resolved = spec.resolve().unwrap();
        assert_eq!(resolved["setup"], vec!["./setup.js"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_computed_with_bad_shape_fails() {
        let spec = EntrySpec::Computed(Arc::new(|| json!(7)));
        assert!(spec.resolve().is_err());
    }

    #[test]
    fn test_empty_entries_are_dropped() {
        let spec = EntrySpec::from_value(&json!({ "empty": [], "kept": "./k.js" })).unwrap();
        let resolved = spec.resolve().unwrap();
        assert!(!resolved.contains_key("empty"));
        assert!(resolved.contains_key("kept"));
    }

    #[test]
    fn test_deserializes_from_config() {
        let spec: EntrySpec = serde_json::from_value(json!(["./x.js"])).unwrap();
        assert!(matches!(spec, EntrySpec::List(ref v) if v == &["./x.js"]));

        let err = serde_json::from_value::<EntrySpec>(json!(3)).unwrap_err();
        assert!(err.to_string().contains("Unsupported entry"));
    }
}
