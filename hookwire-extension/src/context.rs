//! Per-request state threaded through dispatch and storage.

use crate::auth::{Authorization, Role};
use hookwire_model::PropertyFilter;
use hookwire_storage::Transaction;
use hookwire_types::{AttributeMap, Value};
use std::fmt;
use std::sync::Arc;

/// State of one inbound operation.
///
/// The fixed fields every operation needs have named accessors; anything an
/// extension wants to pass along goes into [`extras`](RequestContext::extras).
///
/// Cloning copies the resource map, so a clone can be mutated by handlers
/// without affecting the original. The transaction handle is shared.
#[derive(Clone, Default)]
pub struct RequestContext {
    resource: Option<AttributeMap>,
    schema_id: Option<String>,
    resource_id: Option<String>,
    event_type: Option<String>,
    transaction: Option<Arc<dyn Transaction>>,
    role: Option<Role>,
    auth: Option<Authorization>,
    tenant_id: Option<String>,
    property_filter: Option<Arc<PropertyFilter>>,
    extras: AttributeMap,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("resource", &self.resource)
            .field("schema_id", &self.schema_id)
            .field("resource_id", &self.resource_id)
            .field("event_type", &self.event_type)
            .field("has_transaction", &self.transaction.is_some())
            .field("role", &self.role)
            .field("tenant_id", &self.tenant_id)
            .field("extras", &self.extras)
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Builders ────────────────────────────────────────────────

    pub fn with_resource(mut self, resource: AttributeMap) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_schema_id(mut self, schema_id: &str) -> Self {
        self.schema_id = Some(schema_id.into());
        self
    }

    pub fn with_resource_id(mut self, resource_id: &str) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_transaction(mut self, transaction: Arc<dyn Transaction>) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_auth(mut self, auth: Authorization) -> Self {
        self.tenant_id = Some(auth.tenant_id.clone());
        self.auth = Some(auth);
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_property_filter(mut self, filter: PropertyFilter) -> Self {
        self.property_filter = Some(Arc::new(filter));
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn resource(&self) -> Option<&AttributeMap> {
        self.resource.as_ref()
    }

    pub fn resource_mut(&mut self) -> Option<&mut AttributeMap> {
        self.resource.as_mut()
    }

    pub fn set_resource(&mut self, resource: AttributeMap) {
        self.resource = Some(resource);
    }

    pub fn take_resource(&mut self) -> Option<AttributeMap> {
        self.resource.take()
    }

    pub fn schema_id(&self) -> Option<&str> {
        self.schema_id.as_deref()
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn set_resource_id(&mut self, resource_id: &str) {
        self.resource_id = Some(resource_id.into());
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    pub(crate) fn set_event_type(&mut self, event: &str) {
        self.event_type = Some(event.into());
    }

    pub fn transaction(&self) -> Option<&Arc<dyn Transaction>> {
        self.transaction.as_ref()
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    pub fn auth(&self) -> Option<&Authorization> {
        self.auth.as_ref()
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn property_filter(&self) -> Option<&PropertyFilter> {
        self.property_filter.as_deref()
    }

    pub fn extras(&self) -> &AttributeMap {
        &self.extras
    }

    pub fn extras_mut(&mut self) -> &mut AttributeMap {
        &mut self.extras
    }

    /// The resource with fields hidden by the property filter removed.
    pub fn visible_resource(&self) -> Option<AttributeMap> {
        let resource = self.resource.as_ref()?;
        Some(match self.property_filter.as_deref() {
            Some(filter) if !filter.allows_all() => filter.remove_hidden_keys_from_map(resource),
            _ => resource.clone(),
        })
    }

    /// The open transaction of this request.
    ///
    /// # Panics
    ///
    /// Panics if no transaction is attached or it is already closed. Storage
    /// operations outside a transaction are a caller bug.
    #[track_caller]
    pub fn must_get_open_transaction(&self) -> Arc<dyn Transaction> {
        match &self.transaction {
            Some(tx) if !tx.closed() => Arc::clone(tx),
            _ => panic!("Database function called without open transaction"),
        }
    }
}
