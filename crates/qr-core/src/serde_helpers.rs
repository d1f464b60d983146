//! Small serde helpers shared across the crate.

use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

/// Default function returning `true` for serde defaults
pub(crate) fn default_true() -> bool {
    true
}

/// Used with `skip_serializing_if` for fields that default to `true`
pub(crate) fn is_true(b: &bool) -> bool {
    *b
}

/// Convert a serde_yaml::Value to a serde_json::Value.
///
/// Non-string mapping keys are stringified; NaN/Infinity become null.
pub fn yaml_to_json(yaml: &YamlValue) -> JsonValue {
    match yaml {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(*b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::Number(i.into())
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            } else {
                JsonValue::Null
            }
        }
        YamlValue::String(s) => JsonValue::String(s.clone()),
        YamlValue::Sequence(seq) => JsonValue::Array(seq.iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(map) => {
            let obj: serde_json::Map<String, JsonValue> = map
                .iter()
                .map(|(k, v)| {
                    let key = match k.as_str() {
                        Some(s) => s.to_string(),
                        None => serde_yaml::to_string(k).unwrap_or_default().trim().to_string(),
                    };
                    (key, yaml_to_json(v))
                })
                .collect();
            JsonValue::Object(obj)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}
