//! Resources as seen by extension code.

use crate::environment::Environment;
use crate::logger::Logger;
use hookwire_model::{RawResource, RawResourceType, Schema};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Schema, logger and environment attached to a resource handed to extension
/// code.
#[derive(Debug, Clone)]
pub struct ResourceBase {
    schema: Arc<Schema>,
    logger: Logger,
    env: Environment,
}

impl ResourceBase {
    pub(crate) fn new(env: &Environment, schema: Arc<Schema>) -> Self {
        let logger = env.base_logger().for_schema(&schema.id);
        Self {
            schema,
            logger,
            env: env.share(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// The environment the resource was read or dispatched in, with the same
    /// trace id.
    pub fn environment(&self) -> &Environment {
        &self.env
    }
}

/// A raw resource plus its [`ResourceBase`].
///
/// Schema handlers receive the type-erased form, `DomainResource<dyn RawResource>`;
/// typed reads return `DomainResource<R>`. Both dereference to the raw resource.
pub struct DomainResource<R: ?Sized = dyn RawResource> {
    base: ResourceBase,
    raw: Box<R>,
}

impl<R: ?Sized + fmt::Debug> fmt::Debug for DomainResource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainResource")
            .field("schema_id", &self.base.schema.id)
            .field("raw", &&*self.raw)
            .finish()
    }
}

impl<R: ?Sized> DomainResource<R> {
    pub fn from_box(base: ResourceBase, raw: Box<R>) -> Self {
        Self { base, raw }
    }

    pub fn base(&self) -> &ResourceBase {
        &self.base
    }

    pub fn schema(&self) -> &Schema {
        self.base.schema()
    }

    pub fn logger(&self) -> &Logger {
        self.base.logger()
    }

    pub fn environment(&self) -> &Environment {
        self.base.environment()
    }

    pub fn raw(&self) -> &R {
        &self.raw
    }

    pub fn raw_mut(&mut self) -> &mut R {
        &mut self.raw
    }

    pub fn into_raw(self) -> Box<R> {
        self.raw
    }
}

impl<R> DomainResource<R> {
    pub fn new(base: ResourceBase, raw: R) -> Self {
        Self::from_box(base, Box::new(raw))
    }
}

impl DomainResource {
    pub fn downcast_ref<T: RawResource>(&self) -> Option<&T> {
        self.raw.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: RawResource>(&mut self) -> Option<&mut T> {
        self.raw.as_any_mut().downcast_mut::<T>()
    }
}

impl<R: ?Sized> Deref for DomainResource<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.raw
    }
}

impl<R: ?Sized> DerefMut for DomainResource<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.raw
    }
}

/// A domain resource type built around a raw resource.
///
/// Typed reads through a [`SchemaHandle`](crate::SchemaHandle) return the
/// type registered with
/// [`SchemaRegistrar::register_type`](crate::SchemaRegistrar::register_type).
/// [`DomainResource<R>`] implements it for any raw type; extensions implement
/// it for their own wrappers to attach behavior.
pub trait Resource: Send + Sync + 'static {
    type Raw: RawResourceType;

    fn from_parts(base: ResourceBase, raw: Self::Raw) -> Self;

    fn raw_resource(&self) -> &Self::Raw;

    fn raw_resource_mut(&mut self) -> &mut Self::Raw;
}

impl<R: RawResourceType> Resource for DomainResource<R> {
    type Raw = R;

    fn from_parts(base: ResourceBase, raw: R) -> Self {
        Self::new(base, raw)
    }

    fn raw_resource(&self) -> &R {
        &self.raw
    }

    fn raw_resource_mut(&mut self) -> &mut R {
        &mut self.raw
    }
}
