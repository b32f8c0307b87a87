//! Attribute schemas for provider resources.
//!
//! Each resource declares its attributes once: their type, whether the user
//! must set them, whether the provider computes them, and whether changing
//! them forces the resource to be replaced. Configuration is validated
//! against the schema before any remote call is made.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while validating a configuration against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Configuration for {resource} must be an object")]
    NotAnObject { resource: String },

    #[error("Required attribute '{attribute}' is missing")]
    MissingRequired { attribute: String },

    #[error("Attribute '{attribute}' has invalid type, expected {expected}")]
    InvalidType { attribute: String, expected: String },

    #[error("Attribute '{attribute}' has invalid value '{value}', expected one of {allowed:?}")]
    ValueNotAllowed {
        attribute: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Attribute '{attribute}' is computed and cannot be configured")]
    ComputedAttribute { attribute: String },

    #[error("Unknown attribute '{attribute}' for {resource}")]
    UnknownAttribute { attribute: String, resource: String },
}

/// The value type of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    String,
    /// An ordered list of objects with the given attributes.
    ObjectList(Vec<AttributeSchema>),
}

impl AttributeKind {
    fn describe(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::ObjectList(_) => "list of objects",
        }
    }
}

/// Declaration of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSchema {
    pub name: String,
    pub kind: AttributeKind,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Changing this attribute requires destroying and recreating the resource
    pub force_new: bool,
    pub description: String,
    pub allowed_values: Option<Vec<String>>,
}

impl AttributeSchema {
    fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            description: String::new(),
            allowed_values: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::String)
    }

    pub fn object_list(name: impl Into<String>, elements: Vec<AttributeSchema>) -> Self {
        Self::new(name, AttributeKind::ObjectList(elements))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Set only by the provider, never by the user.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }

    fn validate_value(&self, resource: &str, path: &str, value: &Value) -> Result<(), SchemaError> {
        match (&self.kind, value) {
            (AttributeKind::String, Value::String(s)) => {
                if let Some(allowed) = &self.allowed_values {
                    if !allowed.iter().any(|a| a == s) {
                        return Err(SchemaError::ValueNotAllowed {
                            attribute: path.to_string(),
                            value: s.clone(),
                            allowed: allowed.clone(),
                        });
                    }
                }
                Ok(())
            }
            (AttributeKind::ObjectList(elements), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{}.{}", path, index);
                    let object = item.as_object().ok_or_else(|| SchemaError::InvalidType {
                        attribute: item_path.clone(),
                        expected: "object".to_string(),
                    })?;
                    validate_object(resource, Some(&item_path), elements, object)?;
                }
                Ok(())
            }
            (kind, _) => Err(SchemaError::InvalidType {
                attribute: path.to_string(),
                expected: kind.describe().to_string(),
            }),
        }
    }
}

/// Validates one object level. Nested levels carry `prefix` (e.g. `actions.0`)
/// so errors name the full attribute path.
fn validate_object(
    resource: &str,
    prefix: Option<&str>,
    attributes: &[AttributeSchema],
    object: &Map<String, Value>,
) -> Result<(), SchemaError> {
    let path = |name: &str| match prefix {
        Some(prefix) => format!("{}.{}", prefix, name),
        None => name.to_string(),
    };

    for key in object.keys() {
        let Some(attribute) = attributes.iter().find(|a| &a.name == key) else {
            return Err(SchemaError::UnknownAttribute {
                attribute: path(key.as_str()),
                resource: resource.to_string(),
            });
        };
        if attribute.is_computed_only() && !object[key].is_null() {
            return Err(SchemaError::ComputedAttribute {
                attribute: path(key.as_str()),
            });
        }
    }

    for attribute in attributes {
        match object.get(&attribute.name) {
            None | Some(Value::Null) => {
                if attribute.required {
                    return Err(SchemaError::MissingRequired {
                        attribute: path(&attribute.name),
                    });
                }
            }
            Some(value) => attribute.validate_value(resource, &path(&attribute.name), value)?,
        }
    }
    Ok(())
}

/// Declaration of a resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    pub type_name: String,
    pub description: String,
    pub attributes: Vec<AttributeSchema>,
}

impl ResourceSchema {
    pub fn new(type_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            description: description.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, attribute: AttributeSchema) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check a user configuration against this schema.
    pub fn validate(&self, config: &Value) -> Result<(), SchemaError> {
        let object = config.as_object().ok_or_else(|| SchemaError::NotAnObject {
            resource: self.type_name.clone(),
        })?;
        validate_object(&self.type_name, None, &self.attributes, object)
    }

    /// Names of force-new attributes whose configured value differs from `current`.
    pub fn replacement_attributes(&self, current: &Map<String, Value>, config: &Value) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|a| a.force_new)
            .filter(|a| current.get(&a.name) != config.get(&a.name))
            .map(|a| a.name.clone())
            .collect()
    }
}
