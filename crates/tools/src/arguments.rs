//! Tool Arguments
//!
//! Arguments arrive from the model as loosely-typed JSON. `ToolArguments`
//! validates them against the tool's `ParameterSchema` at the registry
//! boundary, so a malformed call fails before the tool body runs. Tools then
//! read values through typed accessors or deserialize into their own struct.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use phasewright_core::{CoreError, CoreResult, ParameterSchema};

/// Validated argument object for one tool call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: Map<String, Value>,
}

impl ToolArguments {
    /// Normalize a raw JSON value into an argument object.
    ///
    /// `null` becomes an empty object. A string holding a JSON object is
    /// decoded, since several backends send arguments stringified.
    pub fn from_value(value: Value) -> CoreResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(values) => Ok(Self { values }),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(Self::default());
                }
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(Value::Object(values)) => Ok(Self { values }),
                    _ => Err(CoreError::validation(
                        "arguments must be a JSON object, got a plain string",
                    )),
                }
            }
            other => Err(CoreError::validation(format!(
                "arguments must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Check the arguments against `schema`.
    ///
    /// Required properties must be present and non-null; every present
    /// property declared in the schema must match its declared type (and enum,
    /// when given). Undeclared properties are passed through untouched.
    pub fn validate(&self, schema: &ParameterSchema) -> CoreResult<()> {
        validate_object(&self.values, schema, "")
    }

    /// Raw value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Required string argument
    pub fn str(&self, key: &str) -> CoreResult<&str> {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::validation(format!("missing string argument '{}'", key)))
    }

    /// Optional string argument
    pub fn opt_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Required integer argument
    pub fn i64(&self, key: &str) -> CoreResult<i64> {
        self.values
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| CoreError::validation(format!("missing integer argument '{}'", key)))
    }

    /// Optional boolean argument with default
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.values
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// Deserialize the whole argument object into a typed struct.
    pub fn parse<T: DeserializeOwned>(&self) -> CoreResult<T> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|e| CoreError::validation(format!("invalid arguments: {}", e)))
    }

    /// Arguments as a JSON object value
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no arguments were given
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn validate_object(values: &Map<String, Value>, schema: &ParameterSchema, path: &str) -> CoreResult<()> {
    for name in schema.required_names() {
        match values.get(name) {
            None | Some(Value::Null) => {
                return Err(CoreError::validation(format!(
                    "missing required argument '{}{}'",
                    path, name
                )));
            }
            Some(_) => {}
        }
    }

    if let Some(properties) = schema.properties.as_ref() {
        for (name, value) in values {
            if value.is_null() {
                continue;
            }
            if let Some(prop_schema) = properties.get(name) {
                let field = format!("{}{}", path, name);
                validate_value(value, prop_schema, &field)?;
            }
        }
    }

    Ok(())
}

fn validate_value(value: &Value, schema: &ParameterSchema, field: &str) -> CoreResult<()> {
    let matches = match schema.schema_type.as_str() {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    };
    if !matches {
        return Err(CoreError::validation(format!(
            "argument '{}' must be {}, got {}",
            field,
            schema.schema_type,
            json_type_name(value)
        )));
    }

    if let (Some(allowed), Some(s)) = (schema.enum_values.as_ref(), value.as_str()) {
        if !allowed.iter().any(|a| a == s) {
            return Err(CoreError::validation(format!(
                "argument '{}' must be one of [{}], got '{}'",
                field,
                allowed.join(", "),
                s
            )));
        }
    }

    match value {
        Value::Array(items) => {
            if let Some(item_schema) = schema.items.as_ref() {
                for (i, item) in items.iter().enumerate() {
                    validate_value(item, item_schema, &format!("{}[{}]", field, i))?;
                }
            }
        }
        Value::Object(map) if schema.properties.is_some() || schema.required.is_some() => {
            validate_object(map, schema, &format!("{}.", field))?;
        }
        _ => {}
    }

    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
