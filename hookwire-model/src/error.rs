//! Error types for the schema model.

use thiserror::Error;

/// Result type for schema and registry operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type for marshaling operations.
pub type MarshalResult<T> = Result<T, MarshalError>;

/// Errors raised while building or querying schemas.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("schema already registered: {0}")]
    DuplicateSchema(String),

    #[error("schema not found: {0}")]
    UnknownSchema(String),

    #[error("property '{property_id}' not found in schema '{schema_id}'")]
    UnknownProperty {
        schema_id: String,
        property_id: String,
    },
}

/// Property filter configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("cannot have filter with both visible and hidden properties")]
    VisibleAndHidden,
}

/// Errors raised while converting between attribute maps and resources.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// A resource field's storage tag has no matching schema property.
    #[error("storage tag '{tag}' of resource type {type_name} has no property in schema '{schema_id}'")]
    UnknownProperty {
        schema_id: String,
        type_name: &'static str,
        tag: String,
    },

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value {value} out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    /// Structural re-encoding of a nested value failed.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("field '{tag}': {source}")]
    Field {
        tag: String,
        #[source]
        source: Box<MarshalError>,
    },
}

impl MarshalError {
    /// Attaches the storage tag of the field being converted.
    pub fn in_field(self, tag: &str) -> Self {
        Self::Field {
            tag: tag.to_string(),
            source: Box::new(self),
        }
    }

    /// Type mismatch between the expected kind and the value found.
    pub fn mismatch(expected: &'static str, found: &serde_json::Value) -> Self {
        Self::TypeMismatch {
            expected,
            found: kind_of(found),
        }
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(n) if n.is_f64() => "float",
        serde_json::Value::Number(_) => "integer",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
