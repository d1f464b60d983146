//! Context functions and the ordered call log.
//!
//! During manifest construction, templates are rendered not for their SQL
//! output but for their side channel: every `ref()`, `source()`, and
//! `config()` invocation is appended, arguments included, to a shared
//! [`CallLog`] behind an `Arc<Mutex<...>>`. The functions return stable
//! placeholder text so rendering can proceed.

use minijinja::value::{Kwargs, Value};
use minijinja::Error;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One `ref()` invocation as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefCall {
    /// Target model/seed/snapshot name
    pub name: String,
    /// Explicit package, when the two-argument form was used
    pub package: Option<String>,
    /// Explicit version from `version=` / `v=` kwargs
    pub version: Option<i64>,
}

/// One `source()` invocation as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCall {
    pub source_name: String,
    pub table_name: String,
}

/// One captured invocation, in template execution order
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedCall {
    Ref(RefCall),
    Source(SourceCall),
    Config(JsonMap<String, JsonValue>),
}

/// Ordered log of captured invocations from one render.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    /// Every invocation in first-call order
    pub entries: Vec<CapturedCall>,
}

impl CallLog {
    /// All ref calls in first-call order
    pub fn refs(&self) -> Vec<&RefCall> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                CapturedCall::Ref(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    /// All source calls in first-call order
    pub fn sources(&self) -> Vec<&SourceCall> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                CapturedCall::Source(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// All config kwargs merged in call order (later calls win per key)
    pub fn config_dict(&self) -> JsonMap<String, JsonValue> {
        let mut merged = JsonMap::new();
        for entry in &self.entries {
            if let CapturedCall::Config(map) = entry {
                for (k, v) in map {
                    merged.insert(k.clone(), v.clone());
                }
            }
        }
        merged
    }

    /// True when no invocations were captured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared capture channel written to from inside template functions
pub type CallCapture = Arc<Mutex<CallLog>>;

fn poisoned(e: impl std::fmt::Display) -> Error {
    Error::new(
        minijinja::ErrorKind::InvalidOperation,
        format!("capture mutex poisoned: {e}"),
    )
}

/// Create the ref() function.
///
/// Accepts `ref('name')`, `ref('package', 'name')`, and a `version=`/`v=`
/// kwarg on either form. Returns the target name as placeholder text.
pub(crate) fn make_ref_fn(
    capture: CallCapture,
) -> impl Fn(&str, Option<&str>, Kwargs) -> Result<String, Error> + Send + Sync + Clone + 'static {
    move |first: &str, second: Option<&str>, kwargs: Kwargs| {
        let (package, name) = match second {
            Some(name) => (Some(first.to_string()), name.to_string()),
            None => (None, first.to_string()),
        };

        let version: Option<i64> = match kwargs.get::<Option<Value>>("version")? {
            Some(v) => Some(value_to_version(&v)?),
            None => match kwargs.get::<Option<Value>>("v")? {
                Some(v) => Some(value_to_version(&v)?),
                None => None,
            },
        };
        kwargs.assert_all_used()?;

        let call = RefCall {
            name: name.clone(),
            package,
            version,
        };
        capture
            .lock()
            .map_err(poisoned)?
            .entries
            .push(CapturedCall::Ref(call));

        Ok(name)
    }
}

fn value_to_version(v: &Value) -> Result<i64, Error> {
    i64::try_from(v.clone()).or_else(|_| {
        v.as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                Error::new(
                    minijinja::ErrorKind::InvalidOperation,
                    format!("ref version must be an integer, got {}", v),
                )
            })
    })
}

/// Create the source() function. Both arguments are required.
pub(crate) fn make_source_fn(
    capture: CallCapture,
) -> impl Fn(&str, &str) -> Result<String, Error> + Send + Sync + Clone + 'static {
    move |source_name: &str, table_name: &str| {
        let call = SourceCall {
            source_name: source_name.to_string(),
            table_name: table_name.to_string(),
        };
        capture
            .lock()
            .map_err(poisoned)?
            .entries
            .push(CapturedCall::Source(call));

        Ok(format!("{}.{}", source_name, table_name))
    }
}

/// Create the config() function that captures model configuration.
pub(crate) fn make_config_fn(
    capture: CallCapture,
) -> impl Fn(Kwargs) -> Result<String, Error> + Send + Sync + Clone + 'static {
    move |kwargs: Kwargs| {
        let mut map = JsonMap::new();
        for key in kwargs.args() {
            let value = kwargs.get::<Value>(key).map_err(|e| {
                Error::new(
                    minijinja::ErrorKind::InvalidOperation,
                    format!("failed to get config kwarg '{}': {}", key, e),
                )
            })?;
            map.insert(key.to_string(), minijinja_value_to_json(&value));
        }

        capture
            .lock()
            .map_err(poisoned)?
            .entries
            .push(CapturedCall::Config(map));

        // config() renders to nothing
        Ok(String::new())
    }
}

/// Create the var() function over the resolved project variables.
pub(crate) fn make_var_fn(
    vars: JsonMap<String, JsonValue>,
) -> impl Fn(&str, Option<Value>) -> Result<Value, Error> + Send + Sync + Clone + 'static {
    move |name: &str, default: Option<Value>| {
        if let Some(value) = vars.get(name) {
            Ok(json_to_minijinja_value(value))
        } else if let Some(default_val) = default {
            Ok(default_val)
        } else {
            Err(Error::new(
                minijinja::ErrorKind::UndefinedError,
                format!("Variable '{}' is not defined and no default provided", name),
            ))
        }
    }
}

/// Create the env_var() function reading process environment variables.
pub(crate) fn make_env_var_fn(
) -> impl Fn(&str, Option<Value>) -> Result<String, Error> + Send + Sync + Clone + 'static {
    |name: &str, default: Option<Value>| match std::env::var(name) {
        Ok(val) => Ok(val),
        Err(_) => {
            if let Some(d) = default {
                Ok(d.to_string())
            } else {
                Err(Error::new(
                    minijinja::ErrorKind::InvalidOperation,
                    format!(
                        "Environment variable '{}' is not set and no default provided",
                        name
                    ),
                ))
            }
        }
    }
}

/// Convert serde_json::Value to minijinja::Value
pub(crate) fn json_to_minijinja_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::from(()),
        JsonValue::Bool(b) => Value::from(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(f) = n.as_f64() {
                Value::from(f)
            } else {
                Value::from(n.to_string())
            }
        }
        JsonValue::String(s) => Value::from(s.as_str()),
        JsonValue::Array(arr) => {
            let values: Vec<Value> = arr.iter().map(json_to_minijinja_value).collect();
            Value::from(values)
        }
        JsonValue::Object(obj) => {
            let map: HashMap<String, Value> = obj
                .iter()
                .map(|(k, v)| (k.clone(), json_to_minijinja_value(v)))
                .collect();
            Value::from_iter(map)
        }
    }
}

/// Convert a minijinja Value to a serde_json::Value, the inverse of
/// [`json_to_minijinja_value`].
pub(crate) fn minijinja_value_to_json(val: &Value) -> JsonValue {
    use minijinja::value::ValueKind;
    match val.kind() {
        ValueKind::Undefined | ValueKind::None => JsonValue::Null,
        ValueKind::Bool => JsonValue::Bool(val.is_true()),
        ValueKind::Number => {
            let owned = val.clone();
            if let Ok(i) = i64::try_from(owned.clone()) {
                JsonValue::Number(i.into())
            } else if let Ok(f) = f64::try_from(owned) {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            } else {
                JsonValue::Null
            }
        }
        ValueKind::String => JsonValue::String(val.as_str().unwrap_or_default().to_string()),
        ValueKind::Seq => {
            let items: Vec<JsonValue> = val
                .try_iter()
                .map(|iter| iter.map(|v| minijinja_value_to_json(&v)).collect())
                .unwrap_or_default();
            JsonValue::Array(items)
        }
        ValueKind::Map => {
            let mut map = JsonMap::new();
            if let Ok(keys) = val.try_iter() {
                for key in keys {
                    let key_str = key.as_str().unwrap_or_default().to_string();
                    if let Ok(v) = val.get_item(&key) {
                        map.insert(key_str, minijinja_value_to_json(&v));
                    }
                }
            }
            JsonValue::Object(map)
        }
        _ => JsonValue::String(val.to_string()),
    }
}

#[cfg(test)]
#[path = "calls_test.rs"]
mod tests;
