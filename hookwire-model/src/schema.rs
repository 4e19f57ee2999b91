use crate::error::{ModelError, ModelResult};
use hookwire_types::Value;
use serde::{Deserialize, Serialize};

/// Describes a resource type: its properties, relations and custom actions.
///
/// Schemas are loaded once and never mutated by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub properties: Vec<Property>,
    /// Parent schema for nested resources (e.g. `port` under `network`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub on_parent_delete_cascade: bool,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Schemas this schema extends.
    #[serde(default)]
    pub extends: Vec<String>,
}

impl Schema {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            title: id.into(),
            properties: Vec::new(),
            parent: None,
            on_parent_delete_cascade: false,
            actions: Vec::new(),
            extends: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_parent(mut self, parent: &str, on_delete_cascade: bool) -> Self {
        self.parent = Some(parent.into());
        self.on_parent_delete_cascade = on_delete_cascade;
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn extending(mut self, schema_id: &str) -> Self {
        self.extends.push(schema_id.into());
        self
    }

    /// Looks up a property by id (the property id doubles as storage tag).
    pub fn property(&self, id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    /// Like [`Schema::property`] but reports a missing property as an error.
    pub fn property_by_id(&self, id: &str) -> ModelResult<&Property> {
        self.property(id).ok_or_else(|| ModelError::UnknownProperty {
            schema_id: self.id.clone(),
            property_id: id.into(),
        })
    }

    /// Whether `name` is one of this schema's declared custom actions.
    pub fn is_custom_action(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a.id == name)
    }

    pub fn extends_schema(&self, schema_id: &str) -> bool {
        self.extends.iter().any(|id| id == schema_id)
    }
}

/// One field of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Declared type tag (`string`, `integer`, `number`, `boolean`, `object`, `array`).
    #[serde(rename = "type")]
    pub property_type: String,
    /// Schema this property references, if it is a relation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default)]
    pub on_delete_cascade: bool,
    /// Value filled in by storage when a create omits this property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Property {
    pub fn new(id: &str, property_type: &str) -> Self {
        Self {
            id: id.into(),
            title: id.into(),
            property_type: property_type.into(),
            relation: None,
            on_delete_cascade: false,
            default: None,
        }
    }

    /// Shorthand for a string property.
    pub fn string(id: &str) -> Self {
        Self::new(id, "string")
    }

    /// Shorthand for an integer property.
    pub fn integer(id: &str) -> Self {
        Self::new(id, "integer")
    }

    /// Shorthand for a floating point property.
    pub fn number(id: &str) -> Self {
        Self::new(id, "number")
    }

    /// Shorthand for a boolean property.
    pub fn boolean(id: &str) -> Self {
        Self::new(id, "boolean")
    }

    /// Shorthand for a nested object property.
    pub fn object(id: &str) -> Self {
        Self::new(id, "object")
    }

    /// Shorthand for an array property.
    pub fn array(id: &str) -> Self {
        Self::new(id, "array")
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_relation(mut self, schema_id: &str, on_delete_cascade: bool) -> Self {
        self.relation = Some(schema_id.into());
        self.on_delete_cascade = on_delete_cascade;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// A custom action declared by a schema (e.g. `reboot` on `server`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
}

impl Action {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            method: "POST".into(),
            path: format!("/:id/{id}"),
        }
    }
}

/// A property of some schema that references another schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRelationInfo {
    pub schema_id: String,
    pub property_id: String,
    pub on_delete_cascade: bool,
}
