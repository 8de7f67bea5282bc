//! Parameter Schemas
//!
//! The JSON-schema subset used to describe tool parameters. Shared by the
//! model contract (catalog sent to the model) and the tool registry
//! (argument validation at the call boundary).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// JSON Schema for tool parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, ParameterSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterSchema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl ParameterSchema {
    fn leaf(schema_type: &str, description: Option<&str>) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            description: description.map(|s| s.to_string()),
            properties: None,
            required: None,
            items: None,
            enum_values: None,
            default: None,
        }
    }

    /// Create a string schema
    pub fn string(description: Option<&str>) -> Self {
        Self::leaf("string", description)
    }

    /// Create an integer schema
    pub fn integer(description: Option<&str>) -> Self {
        Self::leaf("integer", description)
    }

    /// Create a number schema
    pub fn number(description: Option<&str>) -> Self {
        Self::leaf("number", description)
    }

    /// Create a boolean schema
    pub fn boolean(description: Option<&str>) -> Self {
        Self::leaf("boolean", description)
    }

    /// Create a string schema restricted to a fixed set of values
    pub fn string_enum(description: Option<&str>, values: &[&str]) -> Self {
        let mut schema = Self::leaf("string", description);
        schema.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        schema
    }

    /// Create an object schema
    pub fn object(
        description: Option<&str>,
        properties: HashMap<String, ParameterSchema>,
        required: Vec<String>,
    ) -> Self {
        let mut schema = Self::leaf("object", description);
        schema.properties = Some(properties);
        schema.required = Some(required);
        schema
    }

    /// An object schema that accepts any properties.
    pub fn any_object() -> Self {
        Self::leaf("object", None)
    }

    /// Create an array schema
    pub fn array(description: Option<&str>, items: ParameterSchema) -> Self {
        let mut schema = Self::leaf("array", description);
        schema.items = Some(Box::new(items));
        schema
    }

    /// Names of required properties (empty for non-object schemas).
    pub fn required_names(&self) -> &[String] {
        self.required.as_deref().unwrap_or(&[])
    }
}
