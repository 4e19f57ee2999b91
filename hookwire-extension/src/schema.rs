//! Schema capability: lookups and the transactional resource operations.
//!
//! Writes follow one sequence: take the open transaction from the context,
//! clone the context with the resource, run the `pre_*` event, write through
//! the transaction, absorb the stored row back into the caller's resource,
//! then run the `post_*` event. `db_*` variants skip both events.
//!
//! Reads pass straight through to the transaction. Lock-prefixed reads hand
//! their [`LockPolicy`] to storage untouched.

use crate::context::RequestContext;
use crate::environment::Environment;
use crate::error::{ExtensionError, ExtensionResult};
use crate::resource::{Resource, ResourceBase};
use hookwire_model::{
    AttributeMap, Marshaler, Property, RawResource, RawResourceType, Schema, SchemaRelationInfo,
};
use hookwire_storage::{Filter, LockPolicy, Paginator, ResourceState, StorageError};
use hookwire_types::{ResourceEvent, Value};
use std::sync::Arc;

/// Schemas capability.
#[derive(Clone, Copy)]
pub struct Schemas<'env> {
    env: &'env Environment,
}

impl<'env> Schemas<'env> {
    pub(crate) fn new(env: &'env Environment) -> Self {
        Self { env }
    }

    /// All schemas in load order.
    pub fn list(&self) -> Vec<SchemaHandle<'env>> {
        self.env
            .schema_registry()
            .ordered()
            .iter()
            .map(|schema| SchemaHandle::new(self.env, Arc::clone(schema)))
            .collect()
    }

    /// The schema with `id`; logs a warning when there is none.
    pub fn find(&self, id: &str) -> Option<SchemaHandle<'env>> {
        match self.env.schema_registry().get(id) {
            Some(schema) => Some(SchemaHandle::new(self.env, Arc::clone(schema))),
            None => {
                self.env
                    .base_logger()
                    .warning(format_args!("cannot find schema: {id}"));
                None
            }
        }
    }

    /// Every property of any schema that relates to `id`.
    pub fn relations(&self, id: &str) -> Vec<SchemaRelationInfo> {
        self.env.schema_registry().relations(id)
    }
}

fn filter_by_id(id: &str) -> Filter {
    let mut filter = Filter::new();
    filter.insert("id".into(), Value::String(id.into()));
    filter
}

fn resource_id(map: &AttributeMap) -> Option<&str> {
    map.get("id").and_then(Value::as_str)
}

/// One schema bound to an environment.
#[derive(Clone)]
pub struct SchemaHandle<'env> {
    env: &'env Environment,
    raw: Arc<Schema>,
}

impl std::fmt::Debug for SchemaHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaHandle")
            .field("id", &self.raw.id)
            .finish_non_exhaustive()
    }
}

impl<'env> SchemaHandle<'env> {
    pub(crate) fn new(env: &'env Environment, raw: Arc<Schema>) -> Self {
        Self { env, raw }
    }

    pub fn id(&self) -> &str {
        &self.raw.id
    }

    pub fn raw_schema(&self) -> &Schema {
        &self.raw
    }

    pub fn properties(&self) -> &[Property] {
        &self.raw.properties
    }

    /// Ids of the schemas this schema extends.
    pub fn extends(&self) -> &[String] {
        &self.raw.extends
    }

    /// Schemas that extend this one.
    pub fn derived_schemas(&self) -> Vec<SchemaHandle<'env>> {
        self.env
            .schema_registry()
            .derived_schemas(&self.raw.id)
            .into_iter()
            .map(|schema| SchemaHandle::new(self.env, schema))
            .collect()
    }

    fn base(&self) -> ResourceBase {
        ResourceBase::new(self.env, Arc::clone(&self.raw))
    }

    fn not_found(&self, err: StorageError) -> ExtensionError {
        if err.is_not_found() {
            ExtensionError::ResourceNotFound(self.raw.id.clone())
        } else {
            ExtensionError::Storage(err)
        }
    }

    // ── Conversion ──────────────────────────────────────────────

    /// Decodes `map` into the raw type registered for this schema.
    pub fn resource_from_map(&self, map: &AttributeMap) -> ExtensionResult<Box<dyn RawResource>> {
        match self.env.type_registry().decode(&self.raw.id, map) {
            Some(decoded) => Ok(decoded?),
            None => {
                self.env.base_logger().warning(format_args!(
                    "raw resource type not registered for {}",
                    self.raw.id
                ));
                Err(ExtensionError::MissingType(self.raw.id.clone()))
            }
        }
    }

    fn decode_raw<R: RawResourceType>(&self, map: &AttributeMap) -> ExtensionResult<R> {
        Ok(Marshaler::new(&self.raw).resource_from_map::<R>(map)?)
    }

    fn require_raw<R: RawResourceType>(&self) -> ExtensionResult<()> {
        self.env.type_registry().require_raw::<R>(&self.raw.id)
    }

    fn require_domain<T: Resource>(&self) -> ExtensionResult<()> {
        self.env.type_registry().require_domain::<T>(&self.raw.id)
    }

    fn wrap<T: Resource>(&self, raw: T::Raw) -> T {
        T::from_parts(self.base(), raw)
    }

    // ── Raw reads ───────────────────────────────────────────────

    pub fn list_raw<R: RawResourceType>(
        &self,
        filter: &Filter,
        paginator: Option<&Paginator>,
        ctx: &RequestContext,
    ) -> ExtensionResult<Vec<R>> {
        self.require_raw::<R>()?;
        let tx = ctx.must_get_open_transaction();
        let (rows, _total) = tx.list(&self.raw, filter, &[], paginator)?;
        rows.iter().map(|row| self.decode_raw::<R>(row)).collect()
    }

    pub fn lock_list_raw<R: RawResourceType>(
        &self,
        filter: &Filter,
        paginator: Option<&Paginator>,
        ctx: &RequestContext,
        policy: LockPolicy,
    ) -> ExtensionResult<Vec<R>> {
        self.require_raw::<R>()?;
        let tx = ctx.must_get_open_transaction();
        let (rows, _total) = tx.lock_list(&self.raw, filter, &[], paginator, policy)?;
        rows.iter().map(|row| self.decode_raw::<R>(row)).collect()
    }

    pub fn fetch_raw<R: RawResourceType>(&self, id: &str, ctx: &RequestContext) -> ExtensionResult<R> {
        self.fetch_filter_raw(&filter_by_id(id), ctx)
    }

    pub fn lock_fetch_raw<R: RawResourceType>(
        &self,
        id: &str,
        ctx: &RequestContext,
        policy: LockPolicy,
    ) -> ExtensionResult<R> {
        self.lock_fetch_filter_raw(&filter_by_id(id), ctx, policy)
    }

    pub fn fetch_filter_raw<R: RawResourceType>(
        &self,
        filter: &Filter,
        ctx: &RequestContext,
    ) -> ExtensionResult<R> {
        self.require_raw::<R>()?;
        let tx = ctx.must_get_open_transaction();
        let row = tx
            .fetch(&self.raw, filter)
            .map_err(|err| self.not_found(err))?;
        self.decode_raw(&row)
    }

    pub fn lock_fetch_filter_raw<R: RawResourceType>(
        &self,
        filter: &Filter,
        ctx: &RequestContext,
        policy: LockPolicy,
    ) -> ExtensionResult<R> {
        self.require_raw::<R>()?;
        let tx = ctx.must_get_open_transaction();
        let row = tx
            .lock_fetch(&self.raw, filter, policy)
            .map_err(|err| self.not_found(err))?;
        self.decode_raw(&row)
    }

    pub fn state_fetch_raw(&self, id: &str, ctx: &RequestContext) -> ExtensionResult<ResourceState> {
        let tx = ctx.must_get_open_transaction();
        tx.state_fetch(&self.raw, &filter_by_id(id))
            .map_err(|err| self.not_found(err))
    }

    pub fn count(&self, filter: &Filter, ctx: &RequestContext) -> ExtensionResult<u64> {
        let tx = ctx.must_get_open_transaction();
        Ok(tx.count(&self.raw, filter)?)
    }

    // ── Typed reads ─────────────────────────────────────────────

    pub fn list<T: Resource>(
        &self,
        filter: &Filter,
        paginator: Option<&Paginator>,
        ctx: &RequestContext,
    ) -> ExtensionResult<Vec<T>> {
        self.require_domain::<T>()?;
        let raws = self.list_raw::<T::Raw>(filter, paginator, ctx)?;
        Ok(raws.into_iter().map(|raw| self.wrap(raw)).collect())
    }

    pub fn lock_list<T: Resource>(
        &self,
        filter: &Filter,
        paginator: Option<&Paginator>,
        ctx: &RequestContext,
        policy: LockPolicy,
    ) -> ExtensionResult<Vec<T>> {
        self.require_domain::<T>()?;
        let raws = self.lock_list_raw::<T::Raw>(filter, paginator, ctx, policy)?;
        Ok(raws.into_iter().map(|raw| self.wrap(raw)).collect())
    }

    pub fn fetch<T: Resource>(&self, id: &str, ctx: &RequestContext) -> ExtensionResult<T> {
        self.fetch_filter(&filter_by_id(id), ctx)
    }

    pub fn lock_fetch<T: Resource>(
        &self,
        id: &str,
        ctx: &RequestContext,
        policy: LockPolicy,
    ) -> ExtensionResult<T> {
        self.lock_fetch_filter(&filter_by_id(id), ctx, policy)
    }

    pub fn fetch_filter<T: Resource>(&self, filter: &Filter, ctx: &RequestContext) -> ExtensionResult<T> {
        self.require_domain::<T>()?;
        let raw = self.fetch_filter_raw::<T::Raw>(filter, ctx)?;
        Ok(self.wrap(raw))
    }

    pub fn lock_fetch_filter<T: Resource>(
        &self,
        filter: &Filter,
        ctx: &RequestContext,
        policy: LockPolicy,
    ) -> ExtensionResult<T> {
        self.require_domain::<T>()?;
        let raw = self.lock_fetch_filter_raw::<T::Raw>(filter, ctx, policy)?;
        Ok(self.wrap(raw))
    }

    // ── Writes ──────────────────────────────────────────────────

    /// Creates `resource` with pre/post create events. On success `resource`
    /// holds the stored row.
    ///
    /// # Panics
    ///
    /// Panics if `ctx` carries no open transaction.
    pub fn create_raw<R: RawResource + ?Sized>(
        &self,
        resource: &mut R,
        ctx: &RequestContext,
    ) -> ExtensionResult<()> {
        self.write(resource, ctx, Write::Create, true)
    }

    /// Creates `resource` without triggering events.
    ///
    /// # Panics
    ///
    /// Panics if `ctx` carries no open transaction.
    pub fn db_create_raw<R: RawResource + ?Sized>(
        &self,
        resource: &mut R,
        ctx: &RequestContext,
    ) -> ExtensionResult<()> {
        self.write(resource, ctx, Write::Create, false)
    }

    /// Updates `resource` with pre/post update events.
    ///
    /// # Panics
    ///
    /// Panics if `ctx` carries no open transaction.
    pub fn update_raw<R: RawResource + ?Sized>(
        &self,
        resource: &mut R,
        ctx: &RequestContext,
    ) -> ExtensionResult<()> {
        self.write(resource, ctx, Write::Update, true)
    }

    /// Updates `resource` without triggering events.
    ///
    /// # Panics
    ///
    /// Panics if `ctx` carries no open transaction.
    pub fn db_update_raw<R: RawResource + ?Sized>(
        &self,
        resource: &mut R,
        ctx: &RequestContext,
    ) -> ExtensionResult<()> {
        self.write(resource, ctx, Write::Update, false)
    }

    pub fn create<T: Resource>(&self, resource: &mut T, ctx: &RequestContext) -> ExtensionResult<()> {
        self.create_raw(resource.raw_resource_mut(), ctx)
    }

    pub fn db_create<T: Resource>(&self, resource: &mut T, ctx: &RequestContext) -> ExtensionResult<()> {
        self.db_create_raw(resource.raw_resource_mut(), ctx)
    }

    pub fn update<T: Resource>(&self, resource: &mut T, ctx: &RequestContext) -> ExtensionResult<()> {
        self.update_raw(resource.raw_resource_mut(), ctx)
    }

    pub fn db_update<T: Resource>(&self, resource: &mut T, ctx: &RequestContext) -> ExtensionResult<()> {
        self.db_update_raw(resource.raw_resource_mut(), ctx)
    }

    /// Writes the state columns (and fields) of `resource` without events.
    pub fn db_state_update_raw<R: RawResource + ?Sized>(
        &self,
        resource: &R,
        ctx: &RequestContext,
        state: Option<&ResourceState>,
    ) -> ExtensionResult<()> {
        let tx = ctx.must_get_open_transaction();
        tx.state_update(&self.raw, &resource.to_attribute_map(), state)
            .map_err(|err| self.not_found(err))
    }

    /// Deletes every row matching `filter`, each with pre/post delete events.
    ///
    /// # Panics
    ///
    /// Panics if `ctx` carries no open transaction.
    pub fn delete_raw(&self, filter: &Filter, ctx: &RequestContext) -> ExtensionResult<()> {
        self.delete(filter, ctx, true)
    }

    /// Deletes every row matching `filter` without triggering events.
    ///
    /// # Panics
    ///
    /// Panics if `ctx` carries no open transaction.
    pub fn db_delete_raw(&self, filter: &Filter, ctx: &RequestContext) -> ExtensionResult<()> {
        self.delete(filter, ctx, false)
    }

    fn write<R: RawResource + ?Sized>(
        &self,
        resource: &mut R,
        ctx: &RequestContext,
        op: Write,
        trigger_events: bool,
    ) -> ExtensionResult<()> {
        let tx = ctx.must_get_open_transaction();
        let marshaler = Marshaler::new(&self.raw);
        marshaler.check_tags(resource.type_name(), resource.storage_tags())?;

        let data = marshaler.to_map(resource);
        let id = resource_id(&data).map(str::to_owned);
        if op == Write::Update && id.is_none() {
            return Err(ExtensionError::MissingResourceId(self.raw.id.clone()));
        }

        let mut scoped = ctx.clone().with_schema_id(&self.raw.id).with_resource(data);
        if let Some(id) = &id {
            scoped.set_resource_id(id);
        }

        if trigger_events {
            self.env.handle_event(op.pre().as_str(), &mut scoped)?;
        }

        let current = scoped.resource().cloned().unwrap_or_default();
        let stored = match op {
            Write::Create => tx.create(&self.raw, &current)?,
            Write::Update => tx.update(&self.raw, &current).map_err(|err| self.not_found(err))?,
        };

        marshaler.update_resource(resource, &stored)?;
        if let Some(id) = resource_id(&stored) {
            scoped.set_resource_id(id);
        }
        scoped.set_resource(stored);

        if trigger_events {
            let post = op.post();
            self.env
                .handle_event(post.as_str(), &mut scoped)
                .map_err(|err| ExtensionError::post_event(post.as_str(), err))?;
        }
        Ok(())
    }

    fn delete(&self, filter: &Filter, ctx: &RequestContext, trigger_events: bool) -> ExtensionResult<()> {
        let tx = ctx.must_get_open_transaction();
        let (rows, _total) = tx.list(&self.raw, filter, &[], None)?;

        for row in rows {
            let id = resource_id(&row)
                .map(str::to_owned)
                .ok_or_else(|| ExtensionError::MissingResourceId(self.raw.id.clone()))?;
            let mut scoped = ctx
                .clone()
                .with_schema_id(&self.raw.id)
                .with_resource_id(&id)
                .with_resource(row);

            if trigger_events {
                self.env
                    .handle_event(ResourceEvent::PreDelete.as_str(), &mut scoped)?;
            }

            tx.delete(&self.raw, &id).map_err(|err| self.not_found(err))?;

            if trigger_events {
                self.env
                    .handle_event(ResourceEvent::PostDelete.as_str(), &mut scoped)
                    .map_err(|err| {
                        ExtensionError::post_event(ResourceEvent::PostDelete.as_str(), err)
                    })?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Write {
    Create,
    Update,
}

impl Write {
    fn pre(self) -> ResourceEvent {
        match self {
            Self::Create => ResourceEvent::PreCreate,
            Self::Update => ResourceEvent::PreUpdate,
        }
    }

    fn post(self) -> ResourceEvent {
        match self {
            Self::Create => ResourceEvent::PostCreate,
            Self::Update => ResourceEvent::PostUpdate,
        }
    }
}
