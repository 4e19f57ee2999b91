//! Schema-checked conversion between attribute maps and typed resources.

use crate::error::{MarshalError, MarshalResult};
use crate::resource::{RawResource, RawResourceType};
use crate::schema::Schema;
use hookwire_types::AttributeMap;

/// Converts resources of one schema.
///
/// Every storage tag of the target type must name a property of the schema;
/// a tag without a property is a configuration error and is reported rather
/// than skipped.
#[derive(Debug, Clone, Copy)]
pub struct Marshaler<'a> {
    schema: &'a Schema,
}

impl<'a> Marshaler<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Verifies that every tag names a schema property.
    pub fn check_tags(&self, type_name: &'static str, tags: &[&str]) -> MarshalResult<()> {
        match tags.iter().find(|tag| self.schema.property(tag).is_none()) {
            Some(tag) => Err(MarshalError::UnknownProperty {
                schema_id: self.schema.id.clone(),
                type_name,
                tag: (*tag).to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Builds a fresh `R` from `map`.
    pub fn resource_from_map<R: RawResourceType>(&self, map: &AttributeMap) -> MarshalResult<R> {
        self.check_tags(std::any::type_name::<R>(), R::STORAGE_TAGS)?;
        R::from_attribute_map(map)
    }

    /// Absorbs `map` into an existing resource in place.
    pub fn update_resource<R: RawResource + ?Sized>(
        &self,
        resource: &mut R,
        map: &AttributeMap,
    ) -> MarshalResult<()> {
        self.check_tags(resource.type_name(), resource.storage_tags())?;
        resource.assign_from_map(map)
    }

    /// Emits the resource as an attribute map.
    pub fn to_map<R: RawResource + ?Sized>(&self, resource: &R) -> AttributeMap {
        resource.to_attribute_map()
    }
}
