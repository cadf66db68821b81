use serde::Serialize;
use serde_json::{Map, Value};

use super::resolve::is_safe_custom_key;
use super::schema::{ParameterSchemaEntry, lookup};

/// One validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Offending parameter
    pub parameter: String,
    /// What is wrong
    pub message: String,
    /// Accepted type or range, when the schema declares one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

/// Outcome of validating an override map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Findings that must block persisting the configuration
    pub errors: Vec<ValidationIssue>,
    /// Findings that still allow pass-through
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Whether no errors were found
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, parameter: &str, message: impl Into<String>, entry: Option<&ParameterSchemaEntry>) {
        self.errors.push(ValidationIssue {
            parameter: parameter.to_owned(),
            message: message.into(),
            expected: entry.map(ParameterSchemaEntry::expected),
        });
    }

    fn warning(&mut self, parameter: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            parameter: parameter.to_owned(),
            message: message.into(),
            expected: None,
        });
    }
}

/// Check an override map against a model's parameter schema
///
/// `null` means "unset" and is always accepted.
pub fn validate_overrides(overrides: &Map<String, Value>, schema: &[ParameterSchemaEntry]) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (key, value) in overrides {
        match lookup(schema, key) {
            Some(entry) => validate_known(&mut report, entry, value),
            None if is_safe_custom_key(key) => {
                report.warning(key, "parameter is not declared for this model and is passed through unchecked");
            }
            None => report.error(key, "parameter name is not allowed", None),
        }
    }

    report
}

fn validate_known(report: &mut ValidationReport, entry: &ParameterSchemaEntry, value: &Value) {
    if value.is_null() {
        return;
    }

    if entry.is_array {
        let Some(items) = value.as_array() else {
            report.error(&entry.name, format!("expected an array, got {}", kind(value)), Some(entry));
            return;
        };
        if items.is_empty() {
            report.error(&entry.name, "array must not be empty", Some(entry));
            return;
        }
        for (i, item) in items.iter().enumerate() {
            if let Some(message) = check_scalar(entry, item) {
                report.error(&entry.name, format!("element {i}: {message}"), Some(entry));
            }
        }
        return;
    }

    if let Some(message) = check_scalar(entry, value) {
        report.error(&entry.name, message, Some(entry));
        return;
    }

    if value.as_str().is_some_and(str::is_empty) && !entry.allow_empty_string {
        report.warning(&entry.name, "empty string is treated as unset and will not be sent");
    }
}

/// Type, range and membership checks for one scalar value
fn check_scalar(entry: &ParameterSchemaEntry, value: &Value) -> Option<String> {
    if !entry.param_type.matches(value) {
        return Some(format!("expected {}, got {}", entry.param_type.as_str(), kind(value)));
    }

    if let Some(number) = value.as_f64() {
        if let Some(min) = entry.min
            && number < min
        {
            return Some(format!("{number} is below the minimum {min}"));
        }
        if let Some(max) = entry.max
            && number > max
        {
            return Some(format!("{number} is above the maximum {max}"));
        }
    }

    if let Some(allowed) = &entry.allowed_values
        && !allowed.contains(value)
    {
        return Some(format!("{value} is not an allowed value"));
    }

    None
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
