use serde::Serialize;
use serde_json::{Map, Value};

use super::schema::{ParameterSchemaEntry, lookup};

/// Keys the request builders own; a custom override may never replace them
const RESERVED_WIRE_KEYS: &[&str] = &[
    "model",
    "messages",
    "stream",
    "stream_options",
    "tools",
    "tool_choice",
    "system",
    "contents",
];

/// Keys that reshape objects rather than set values in dynamic runtimes
const POLLUTING_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

/// Whether a value should be forwarded to the vendor
///
/// `null` and empty arrays are never sent. Empty strings are sent only when
/// the parameter explicitly opts in. Schema-unknown keys pass `None`.
pub fn should_emit(value: &Value, entry: Option<&ParameterSchemaEntry>) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) if s.is_empty() => entry.is_some_and(|e| e.allow_empty_string),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Whether a schema-unknown key may be forwarded
pub fn is_safe_custom_key(key: &str) -> bool {
    if key.is_empty() || key.trim() != key {
        return false;
    }
    if key.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return false;
    }
    if key.starts_with("__") || POLLUTING_KEYS.contains(&key) {
        return false;
    }
    !RESERVED_WIRE_KEYS.contains(&key)
}

/// Parameter values for one request, split by schema membership
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverrideSet {
    /// Keys declared in the model schema
    pub known: Map<String, Value>,
    /// Keys the schema does not declare
    pub custom: Map<String, Value>,
}

impl OverrideSet {
    /// Overlay `overrides` key by key; later values win
    ///
    /// Unsafe custom keys are discarded. Re-applying the same overrides is a
    /// no-op.
    pub fn merge(&mut self, overrides: &Map<String, Value>, schema: &[ParameterSchemaEntry]) {
        for (key, value) in overrides {
            if lookup(schema, key).is_some() {
                self.known.insert(key.clone(), value.clone());
            } else if is_safe_custom_key(key) {
                self.custom.insert(key.clone(), value.clone());
            } else {
                tracing::warn!(key = %key, "discarding unsafe custom parameter");
            }
        }
    }

    /// Whether nothing has been set
    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.custom.is_empty()
    }

    /// The keys and values actually sent to the vendor
    pub fn emitted(&self, schema: &[ParameterSchemaEntry]) -> Map<String, Value> {
        let known = self
            .known
            .iter()
            .filter(|(key, value)| should_emit(value, lookup(schema, key)));
        let custom = self.custom.iter().filter(|(_, value)| should_emit(value, None));

        known.chain(custom).map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Persisted and per-request override sources, lowest precedence first
#[derive(Debug, Clone, Copy, Default)]
pub struct OverrideLayers<'a> {
    /// Legacy bucket of schema-unknown overrides
    pub legacy_custom: Option<&'a Map<String, Value>>,
    /// Bucket of schema-known overrides
    pub builtin: Option<&'a Map<String, Value>>,
    /// Overrides supplied with the current request
    pub request: Option<&'a Map<String, Value>>,
}

/// Merge every override source for one request
///
/// Schema defaults form the bottom layer when `include_defaults` is set.
pub fn resolve_overrides(
    schema: &[ParameterSchemaEntry],
    layers: OverrideLayers<'_>,
    include_defaults: bool,
) -> OverrideSet {
    let mut set = OverrideSet::default();

    if include_defaults {
        for entry in schema {
            if let Some(default) = &entry.default {
                set.known.insert(entry.name.clone(), default.clone());
            }
        }
    }

    for layer in [layers.legacy_custom, layers.builtin, layers.request].into_iter().flatten() {
        set.merge(layer, schema);
    }

    set
}
