//! Ordered schema registry.
//!
//! Built once at load time and then shared read-only (behind an `Arc`) by
//! every component that needs schema lookup.

use crate::error::{ModelError, ModelResult};
use crate::schema::{Schema, SchemaRelationInfo};
use std::collections::HashMap;
use std::sync::Arc;

/// Schemas in load order, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<Arc<Schema>>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from schemas in the given order.
    pub fn from_schemas(schemas: impl IntoIterator<Item = Schema>) -> ModelResult<Self> {
        let mut registry = Self::new();
        for schema in schemas {
            registry.register(schema)?;
        }
        Ok(registry)
    }

    /// Appends a schema. Ids must be unique.
    pub fn register(&mut self, schema: Schema) -> ModelResult<()> {
        if self.index.contains_key(&schema.id) {
            return Err(ModelError::DuplicateSchema(schema.id));
        }
        self.index.insert(schema.id.clone(), self.schemas.len());
        self.schemas.push(Arc::new(schema));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Schema>> {
        self.index.get(id).map(|&i| &self.schemas[i])
    }

    /// Like [`SchemaRegistry::get`] but reports a missing schema as an error.
    pub fn require(&self, id: &str) -> ModelResult<&Arc<Schema>> {
        self.get(id)
            .ok_or_else(|| ModelError::UnknownSchema(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All schemas in load order.
    pub fn ordered(&self) -> &[Arc<Schema>] {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Every property, across all schemas, that references schema `id`.
    ///
    /// When the referencing schema is a child of `id` (its `parent` equals the
    /// relation), the schema-level `on_parent_delete_cascade` flag wins over
    /// the property's own flag.
    pub fn relations(&self, id: &str) -> Vec<SchemaRelationInfo> {
        let mut relations = Vec::new();
        for schema in &self.schemas {
            for property in &schema.properties {
                if property.relation.as_deref() != Some(id) {
                    continue;
                }
                let on_delete_cascade = if schema.parent.as_deref() == Some(id) {
                    schema.on_parent_delete_cascade
                } else {
                    property.on_delete_cascade
                };
                relations.push(SchemaRelationInfo {
                    schema_id: schema.id.clone(),
                    property_id: property.id.clone(),
                    on_delete_cascade,
                });
            }
        }
        relations
    }

    /// Schemas that list `id` in their `extends`.
    pub fn derived_schemas(&self, id: &str) -> Vec<Arc<Schema>> {
        self.schemas
            .iter()
            .filter(|schema| schema.extends_schema(id))
            .cloned()
            .collect()
    }
}
