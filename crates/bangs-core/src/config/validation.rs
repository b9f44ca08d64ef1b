//! Config validation - warns about unknown fields

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Validate JSON config and warn about unknown fields.
pub fn warn_unknown_fields(content: &str, config_name: &str) {
    let Ok(value) = serde_json::from_str::<Value>(content) else {
        return;
    };

    let expected = expected_config_keys();
    let unknowns = find_unknown_keys(&value, &expected, "");

    for path in unknowns {
        warn!("Unknown config field in {config_name}: {path}");
    }
}

/// Find unknown keys in JSON value compared to expected keys.
/// Returns paths like "omnibox.unknownField" for unknown fields.
fn find_unknown_keys(value: &Value, expected: &ExpectedKeys, prefix: &str) -> Vec<String> {
    let mut unknowns = Vec::new();

    let Value::Object(obj) = value else {
        return unknowns;
    };

    for (key, child) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        if let Some(nested) = expected.nested.get(key.as_str()) {
            unknowns.extend(find_unknown_keys(child, nested, &path));
        } else if !expected.fields.contains(key.as_str()) {
            unknowns.push(path);
        }
    }

    unknowns
}

/// Expected keys for a config section.
/// `fields` are leaf fields, `nested` are nested objects with their own expected keys.
struct ExpectedKeys {
    fields: HashSet<&'static str>,
    nested: HashMap<&'static str, ExpectedKeys>,
}

impl ExpectedKeys {
    fn new(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.iter().copied().collect(),
            nested: HashMap::new(),
        }
    }

    fn with_nested(mut self, key: &'static str, nested: ExpectedKeys) -> Self {
        self.nested.insert(key, nested);
        self
    }
}

fn expected_config_keys() -> ExpectedKeys {
    let omnibox_keys =
        ExpectedKeys::new(&["defaultDescription", "readyTimeoutMs", "paramEncoding"]);
    let storage_keys = ExpectedKeys::new(&["path", "defaultBangs"]);

    ExpectedKeys::new(&[])
        .with_nested("omnibox", omnibox_keys)
        .with_nested("storage", storage_keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unknowns(json: &str) -> Vec<String> {
        let value: Value = serde_json::from_str(json).unwrap();
        find_unknown_keys(&value, &expected_config_keys(), "")
    }

    #[test]
    fn test_valid_config_no_warnings() {
        let found = unknowns(
            r#"{
                "omnibox": {"paramEncoding": "raw", "readyTimeoutMs": 100},
                "storage": {"path": "/tmp/s.json"}
            }"#,
        );
        assert!(found.is_empty(), "Expected no unknowns, got: {found:?}");
    }

    #[test]
    fn test_unknown_top_level_field() {
        assert_eq!(unknowns(r#"{"omnibox": {}, "search": {}}"#), vec!["search"]);
    }

    #[test]
    fn test_unknown_nested_field() {
        assert_eq!(
            unknowns(r#"{"storage": {"path": "/x", "typo": 1}}"#),
            vec!["storage.typo"]
        );
    }

    #[test]
    fn test_empty_config_no_warnings() {
        assert!(unknowns("{}").is_empty());
    }

    #[test]
    fn test_warn_unknown_fields_does_not_panic_on_invalid_json() {
        warn_unknown_fields("not valid json", "test");
    }
}
