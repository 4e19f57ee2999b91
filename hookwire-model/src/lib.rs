//! Schema model for hookwire.
//!
//! Defines the types every runtime subsystem depends on:
//! - [`Schema`] / [`Property`]: declarative resource type descriptions
//! - [`SchemaRegistry`]: the ordered, read-only-after-load schema set
//! - [`PropertyFilter`]: field visibility (allow-all / deny-all / allow-list / deny-list)
//! - [`RawResource`] / [`AttributeValue`]: the explicit, per-type marshaling
//!   contract between attribute maps and typed resource structs
//! - [`Marshaler`]: schema-checked conversion between the two shapes
//!
//! Resource structs are usually declared with the [`raw_resource!`] macro,
//! which generates the marshaling code from storage tags.

mod error;
mod filter;
mod macros;
mod marshal;
mod registry;
mod resource;
mod schema;

pub use error::{FilterError, MarshalError, MarshalResult, ModelError, ModelResult};
pub use filter::PropertyFilter;
pub use marshal::Marshaler;
pub use registry::SchemaRegistry;
pub use resource::{AttributeValue, Json, RawResource, RawResourceType};
pub use schema::{Action, Property, Schema, SchemaRelationInfo};

pub use hookwire_types::{AttributeMap, Value};
