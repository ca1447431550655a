//! Property merging for flat mappings such as entitlements

use serde_json::{Map, Value};

/// Set `key` to `override_value` when it is present and non-empty, else to `fallback`
///
/// Any previous value is overwritten.
pub fn merge_property(
    map: &mut Map<String, Value>,
    key: &str,
    override_value: Option<&str>,
    fallback: &str,
) {
    let value = override_value.filter(|v| !v.is_empty()).unwrap_or(fallback);
    map.insert(key.to_string(), Value::String(value.to_string()));
}
