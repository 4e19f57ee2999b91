//! Handler and type registries, and the registrar initializers write them through.
//!
//! Registries are built from scratch on every [`Environment::start`] and
//! published behind an `Arc`; dispatch only ever reads them.

use crate::context::RequestContext;
use crate::environment::Environment;
use crate::error::{ExtensionError, ExtensionResult, HandlerError};
use crate::logger::Logger;
use crate::resource::{DomainResource, Resource};
use hookwire_model::{Marshaler, MarshalResult, RawResource, RawResourceType, Schema, SchemaRegistry};
use hookwire_types::{AttributeMap, CustomEvent, Priority, ResourceEvent};
use std::any::{TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Schema-agnostic handler.
pub type Handler =
    Arc<dyn Fn(&mut RequestContext, &Environment) -> Result<(), HandlerError> + Send + Sync>;

/// Handler bound to one schema; receives the resource decoded from the context.
pub type SchemaHandler = Arc<
    dyn Fn(&mut RequestContext, &mut DomainResource, &Environment) -> Result<(), HandlerError>
        + Send
        + Sync,
>;

/// Handlers bucketed by priority.
///
/// Iteration visits priorities in ascending numeric order and, within one
/// priority, handlers in registration order.
#[derive(Clone)]
pub struct PrioritizedHandlers<H> {
    buckets: BTreeMap<Priority, Vec<H>>,
}

impl<H> Default for PrioritizedHandlers<H> {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }
}

impl<H> PrioritizedHandlers<H> {
    /// Appends `handler` to the bucket of `priority`. Duplicates are kept.
    pub fn push(&mut self, priority: Priority, handler: H) {
        self.buckets.entry(priority).or_default().push(handler);
    }

    /// Priorities present, ascending.
    pub fn priorities(&self) -> Vec<Priority> {
        self.buckets.keys().copied().collect()
    }

    /// `(priority, index within bucket, handler)` in invocation order.
    pub fn iter(&self) -> impl Iterator<Item = (Priority, usize, &H)> {
        self.buckets.iter().flat_map(|(&priority, handlers)| {
            handlers
                .iter()
                .enumerate()
                .map(move |(index, handler)| (priority, index, handler))
        })
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Event name to prioritized handlers, generic and per schema.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    generic: HashMap<String, PrioritizedHandlers<Handler>>,
    by_schema: HashMap<String, HashMap<String, PrioritizedHandlers<SchemaHandler>>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let generic: BTreeMap<&str, usize> = self
            .generic
            .iter()
            .map(|(event, handlers)| (event.as_str(), handlers.len()))
            .collect();
        let by_schema: BTreeMap<(&str, &str), usize> = self
            .by_schema
            .iter()
            .flat_map(|(event, schemas)| {
                schemas.iter().map(move |(schema_id, handlers)| {
                    ((event.as_str(), schema_id.as_str()), handlers.len())
                })
            })
            .collect();
        f.debug_struct("HandlerRegistry")
            .field("generic", &generic)
            .field("by_schema", &by_schema)
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event: &str, handler: Handler, priority: Priority) {
        self.generic
            .entry(event.to_string())
            .or_default()
            .push(priority, handler);
    }

    pub fn register_for_schema(
        &mut self,
        event: &str,
        schema_id: &str,
        handler: SchemaHandler,
        priority: Priority,
    ) {
        self.by_schema
            .entry(event.to_string())
            .or_default()
            .entry(schema_id.to_string())
            .or_default()
            .push(priority, handler);
    }

    /// Generic handlers of `event`.
    pub fn resolve(&self, event: &str) -> Option<&PrioritizedHandlers<Handler>> {
        self.generic.get(event)
    }

    /// Handlers of `event` bound to `schema_id`.
    pub fn resolve_for_schema(
        &self,
        event: &str,
        schema_id: &str,
    ) -> Option<&PrioritizedHandlers<SchemaHandler>> {
        self.by_schema.get(event)?.get(schema_id)
    }

    /// Schema ids with handlers for `event`.
    pub fn schemas_for(&self, event: &str) -> impl Iterator<Item = &str> {
        self.by_schema
            .get(event)
            .into_iter()
            .flat_map(|schemas| schemas.keys().map(String::as_str))
    }

    pub fn has_schema_handlers(&self, event: &str) -> bool {
        self.by_schema.contains_key(event)
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        let generic: usize = self.generic.values().map(PrioritizedHandlers::len).sum();
        let by_schema: usize = self
            .by_schema
            .values()
            .flat_map(HashMap::values)
            .map(PrioritizedHandlers::len)
            .sum();
        generic + by_schema
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type DecodeFn = fn(&AttributeMap) -> MarshalResult<Box<dyn RawResource>>;

fn decode_raw<R: RawResourceType>(map: &AttributeMap) -> MarshalResult<Box<dyn RawResource>> {
    Ok(Box::new(R::from_attribute_map(map)?))
}

#[derive(Debug, Clone, Copy)]
struct RawTypeEntry {
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeFn,
}

#[derive(Debug, Clone, Copy)]
struct DomainTypeEntry {
    type_id: TypeId,
    type_name: &'static str,
}

/// Schema id to the Rust types registered for it.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    raw: HashMap<String, RawTypeEntry>,
    domain: HashMap<String, DomainTypeEntry>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `R` as the raw type of `schema_id`, replacing any previous one.
    pub fn register_raw<R: RawResourceType>(&mut self, schema_id: &str) {
        self.raw.insert(
            schema_id.to_string(),
            RawTypeEntry {
                type_id: TypeId::of::<R>(),
                type_name: type_name::<R>(),
                decode: decode_raw::<R>,
            },
        );
    }

    /// Registers `T` as the domain type of `schema_id`, replacing any previous one.
    pub fn register_domain<T: Resource>(&mut self, schema_id: &str) {
        self.domain.insert(
            schema_id.to_string(),
            DomainTypeEntry {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
            },
        );
    }

    pub fn raw_type_name(&self, schema_id: &str) -> Option<&'static str> {
        self.raw.get(schema_id).map(|entry| entry.type_name)
    }

    pub fn domain_type_name(&self, schema_id: &str) -> Option<&'static str> {
        self.domain.get(schema_id).map(|entry| entry.type_name)
    }

    /// Decodes `map` into the raw type of `schema_id`, if one is registered.
    pub fn decode(
        &self,
        schema_id: &str,
        map: &AttributeMap,
    ) -> Option<MarshalResult<Box<dyn RawResource>>> {
        self.raw.get(schema_id).map(|entry| (entry.decode)(map))
    }

    /// Checks that `R` is the raw type registered for `schema_id`.
    pub fn require_raw<R: 'static>(&self, schema_id: &str) -> ExtensionResult<()> {
        let entry = self
            .raw
            .get(schema_id)
            .ok_or_else(|| ExtensionError::MissingType(schema_id.to_string()))?;
        check_type::<R>(schema_id, entry.type_id, entry.type_name)
    }

    /// Checks that `T` is the domain type registered for `schema_id`.
    pub fn require_domain<T: 'static>(&self, schema_id: &str) -> ExtensionResult<()> {
        let entry = self
            .domain
            .get(schema_id)
            .ok_or_else(|| ExtensionError::MissingType(schema_id.to_string()))?;
        check_type::<T>(schema_id, entry.type_id, entry.type_name)
    }
}

fn check_type<T: 'static>(
    schema_id: &str,
    registered: TypeId,
    registered_name: &'static str,
) -> ExtensionResult<()> {
    if registered == TypeId::of::<T>() {
        Ok(())
    } else {
        Err(ExtensionError::TypeMismatch {
            schema_id: schema_id.to_string(),
            registered: registered_name,
            requested: type_name::<T>(),
        })
    }
}

/// Registration surface handed to extension initializers.
pub struct Registrar {
    schemas: Arc<SchemaRegistry>,
    handlers: HandlerRegistry,
    types: TypeRegistry,
    logger: Logger,
}

impl fmt::Debug for Registrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registrar")
            .field("handlers", &self.handlers)
            .field("types", &self.types)
            .finish_non_exhaustive()
    }
}

impl Registrar {
    pub(crate) fn new(schemas: Arc<SchemaRegistry>, logger: Logger) -> Self {
        Self {
            schemas,
            handlers: HandlerRegistry::new(),
            types: TypeRegistry::new(),
            logger,
        }
    }

    pub(crate) fn finish(self) -> (HandlerRegistry, TypeRegistry) {
        (self.handlers, self.types)
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Registers a schema-agnostic handler for `event`.
    pub fn register_event_handler<F>(&mut self, event: impl AsRef<str>, handler: F, priority: Priority)
    where
        F: Fn(&mut RequestContext, &Environment) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers
            .register(event.as_ref(), Arc::new(handler), priority);
    }

    /// Registration scoped to one schema.
    pub fn schema(&mut self, id: &str) -> ExtensionResult<SchemaRegistrar<'_>> {
        let schema = match self.schemas.get(id) {
            Some(schema) => Arc::clone(schema),
            None => {
                self.logger.warning(format_args!("cannot find schema: {id}"));
                return Err(ExtensionError::SchemaNotFound(id.to_string()));
            }
        };
        Ok(SchemaRegistrar {
            registrar: self,
            schema,
        })
    }
}

/// Registration for one schema, obtained from [`Registrar::schema`].
pub struct SchemaRegistrar<'r> {
    registrar: &'r mut Registrar,
    schema: Arc<Schema>,
}

impl SchemaRegistrar<'_> {
    pub fn id(&self) -> &str {
        &self.schema.id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Registers a handler receiving the resource decoded from the context.
    ///
    /// # Panics
    ///
    /// Panics if `event` is also declared as a custom action of this schema.
    #[track_caller]
    pub fn register_resource_event_handler<F>(
        &mut self,
        event: ResourceEvent,
        handler: F,
        priority: Priority,
    ) where
        F: Fn(&mut RequestContext, &mut DomainResource, &Environment) -> Result<(), HandlerError>
            + Send
            + Sync
            + 'static,
    {
        if self.schema.is_custom_action(event.as_str()) {
            panic!(
                "Cannot register an event handler: {} is a custom action for schema {}",
                event, self.schema.id
            );
        }
        self.registrar.handlers.register_for_schema(
            event.as_str(),
            &self.schema.id,
            Arc::new(handler),
            priority,
        );
    }

    /// Like [`register_resource_event_handler`](Self::register_resource_event_handler)
    /// with the resource downcast to `R`.
    ///
    /// # Panics
    ///
    /// Panics if `event` is also declared as a custom action of this schema.
    #[track_caller]
    pub fn register_typed_handler<R, F>(&mut self, event: ResourceEvent, handler: F, priority: Priority)
    where
        R: RawResource,
        F: Fn(&mut RequestContext, &mut R, &Environment) -> Result<(), HandlerError>
            + Send
            + Sync
            + 'static,
    {
        let schema_id = self.schema.id.clone();
        self.register_resource_event_handler(
            event,
            move |ctx, resource, env| {
                let found = resource.type_name();
                match resource.downcast_mut::<R>() {
                    Some(typed) => handler(ctx, typed, env),
                    None => Err(HandlerError::internal(format!(
                        "resource of schema '{schema_id}' is {found}, not {}",
                        type_name::<R>()
                    ))),
                }
            },
            priority,
        );
    }

    /// Registers a handler for a custom action.
    ///
    /// Dispatch still decodes the context resource into the schema's raw type
    /// and writes it back after each handler, so the schema needs a registered
    /// raw type even though the handler never sees the resource.
    pub fn register_custom_event_handler<F>(
        &mut self,
        event: impl Into<CustomEvent>,
        handler: F,
        priority: Priority,
    ) where
        F: Fn(&mut RequestContext, &Environment) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let event = event.into();
        let wrapped: SchemaHandler = Arc::new(
            move |ctx: &mut RequestContext, _resource: &mut DomainResource, env: &Environment| {
                handler(ctx, env)
            },
        );
        self.registrar.handlers.register_for_schema(
            event.as_str(),
            &self.schema.id,
            wrapped,
            priority,
        );
    }

    /// Registers `R` as the raw resource type of this schema.
    ///
    /// Every storage tag of `R` must name a property of the schema.
    pub fn register_raw_type<R: RawResourceType>(&mut self) -> ExtensionResult<()> {
        Marshaler::new(&self.schema).check_tags(type_name::<R>(), R::STORAGE_TAGS)?;
        self.registrar.types.register_raw::<R>(&self.schema.id);
        Ok(())
    }

    /// Registers `T` as the domain resource type of this schema.
    pub fn register_type<T: Resource>(&mut self) -> ExtensionResult<()> {
        Marshaler::new(&self.schema)
            .check_tags(type_name::<T::Raw>(), <T::Raw as RawResourceType>::STORAGE_TAGS)?;
        self.registrar.types.register_domain::<T>(&self.schema.id);
        Ok(())
    }
}
