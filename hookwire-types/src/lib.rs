//! Core type definitions for hookwire.
//!
//! This crate defines the fundamental, schema-agnostic types used throughout
//! the runtime:
//! - [`AttributeMap`]: the loosely-typed wire/storage shape of a resource
//! - Nullable wrappers ([`Null`], [`NullString`], [`NullInt`], ...)
//! - Lifecycle event names and handler priorities
//! - Trace identifiers for isolated environment clones
//!
//! Schema-specific resource types belong in extensions, not here.

mod event;
mod ids;
mod null;

pub use event::{CustomEvent, Priority, ResourceEvent, DEFAULT_PRIORITY};
pub use ids::TraceId;
pub use null::{Null, NullBool, NullFloat, NullInt, NullString};

/// A single attribute value as exchanged with storage and handlers.
pub type Value = serde_json::Value;

/// Attribute map keyed by storage tag.
pub type AttributeMap = serde_json::Map<String, Value>;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unknown resource event: {0}")]
    UnknownEvent(String),
}
