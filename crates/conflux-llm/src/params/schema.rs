use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared value type of a tunable parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Any JSON number
    Number,
    /// JSON number without a fractional representation
    Integer,
    /// `true` or `false`
    Boolean,
    /// JSON string
    String,
}

impl ParameterType {
    /// Name used in validation messages
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::String => "string",
        }
    }

    /// Whether `value` has this type
    ///
    /// Integers are strict: `1.0` is a number but not an integer.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::String => value.is_string(),
        }
    }

    const fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Integer)
    }
}

/// One declared tunable parameter of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchemaEntry {
    /// Parameter key as sent on the wire
    pub name: String,
    /// Declared type (of each element when `is_array` is set)
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    /// Inclusive lower bound for numeric parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Closed set of accepted values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
    /// Value used when defaults are requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// The parameter is a list of `param_type` values
    #[serde(default)]
    pub is_array: bool,
    /// An empty string is a meaningful value and is sent
    #[serde(default)]
    pub allow_empty_string: bool,
    /// Short human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterSchemaEntry {
    fn new(name: &str, param_type: ParameterType) -> Self {
        Self {
            name: name.to_owned(),
            param_type,
            min: None,
            max: None,
            allowed_values: None,
            default: None,
            is_array: false,
            allow_empty_string: false,
            description: None,
        }
    }

    /// Floating-point parameter
    pub fn number(name: &str) -> Self {
        Self::new(name, ParameterType::Number)
    }

    /// Integer parameter
    pub fn integer(name: &str) -> Self {
        Self::new(name, ParameterType::Integer)
    }

    /// Boolean parameter
    pub fn boolean(name: &str) -> Self {
        Self::new(name, ParameterType::Boolean)
    }

    /// String parameter
    pub fn string(name: &str) -> Self {
        Self::new(name, ParameterType::String)
    }

    /// Inclusive numeric range
    #[must_use]
    pub const fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Inclusive lower bound only
    #[must_use]
    pub const fn at_least(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Declared default
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Restrict to a closed set of values
    #[must_use]
    pub fn allowed(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.allowed_values = Some(values.into_iter().collect());
        self
    }

    /// Mark as a list of values
    #[must_use]
    pub const fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// Send empty strings instead of omitting them
    #[must_use]
    pub const fn allow_empty(mut self) -> Self {
        self.allow_empty_string = true;
        self
    }

    /// Attach a description
    #[must_use]
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    /// Human-readable form of what this entry accepts
    pub fn expected(&self) -> String {
        let base = self.param_type.as_str();
        let mut expected = if self.is_array {
            format!("non-empty array of {base}")
        } else {
            base.to_owned()
        };

        if self.param_type.is_numeric() {
            match (self.min, self.max) {
                (Some(min), Some(max)) => expected.push_str(&format!(" in [{min}, {max}]")),
                (Some(min), None) => expected.push_str(&format!(" >= {min}")),
                (None, Some(max)) => expected.push_str(&format!(" <= {max}")),
                (None, None) => {}
            }
        }
        if let Some(allowed) = &self.allowed_values {
            let list: Vec<String> = allowed.iter().map(Value::to_string).collect();
            expected.push_str(&format!(" one of [{}]", list.join(", ")));
        }

        expected
    }
}

/// Find a parameter by name
pub fn lookup<'a>(schema: &'a [ParameterSchemaEntry], name: &str) -> Option<&'a ParameterSchemaEntry> {
    schema.iter().find(|entry| entry.name == name)
}
