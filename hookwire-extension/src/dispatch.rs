//! Event dispatch.
//!
//! Order for one event:
//! 1. schema handlers: for the context's schema only, or for every schema
//!    with handlers (in schema load order) when the context names none
//! 2. generic handlers
//!
//! Within each group priorities run ascending and a bucket runs in
//! registration order. The first failing handler aborts the whole dispatch.

use crate::context::RequestContext;
use crate::environment::Environment;
use crate::error::{ExtensionError, ExtensionResult};
use crate::registry::{PrioritizedHandlers, SchemaHandler};
use crate::resource::{DomainResource, ResourceBase};
use hookwire_model::Schema;
use std::sync::Arc;
use tracing::debug;

impl Environment {
    /// Dispatches `event` to every matching handler.
    ///
    /// Schema handlers see the context resource decoded into the schema's raw
    /// type; after each one the context resource is replaced by the
    /// re-encoded, possibly modified, resource.
    pub fn handle_event(&self, event: &str, ctx: &mut RequestContext) -> ExtensionResult<()> {
        self.ensure_running()?;
        ctx.set_event_type(event);

        let handlers = self.handler_registry();
        if handlers.has_schema_handlers(event) {
            match ctx.schema_id().map(str::to_owned) {
                Some(schema_id) => {
                    if let Some(prioritized) = handlers.resolve_for_schema(event, &schema_id) {
                        match self.schema_registry().get(&schema_id) {
                            Some(schema) => {
                                self.dispatch_schema_event(prioritized, schema, event, ctx)?;
                            }
                            None => self
                                .base_logger()
                                .warning(format_args!("cannot find schema: {schema_id}")),
                        }
                    }
                }
                None => {
                    let registry = self.schema_registry();
                    if let Some(missing) = handlers.schemas_for(event).find(|id| !registry.contains(id)) {
                        return Err(ExtensionError::SchemaNotFound(missing.to_string()));
                    }
                    for schema in registry.ordered() {
                        if let Some(prioritized) = handlers.resolve_for_schema(event, &schema.id) {
                            self.dispatch_schema_event(prioritized, schema, event, ctx)?;
                        }
                    }
                }
            }
        }

        if let Some(prioritized) = handlers.resolve(event) {
            for (priority, index, handler) in prioritized.iter() {
                handler(ctx, self).map_err(|source| ExtensionError::Handler {
                    event: event.to_string(),
                    priority,
                    index,
                    source,
                })?;
            }
        }

        Ok(())
    }

    fn dispatch_schema_event(
        &self,
        prioritized: &PrioritizedHandlers<SchemaHandler>,
        schema: &Arc<Schema>,
        event: &str,
        ctx: &mut RequestContext,
    ) -> ExtensionResult<()> {
        debug!(event, schema_id = %schema.id, trace_id = %self.trace_id(), "starting event");

        let mut resource = self.resource_from_context(schema, event, ctx)?;
        for (priority, index, handler) in prioritized.iter() {
            handler(ctx, &mut resource, self).map_err(|source| ExtensionError::SchemaHandler {
                event: event.to_string(),
                schema_id: schema.id.clone(),
                priority,
                index,
                source,
            })?;
            ctx.set_resource(resource.to_attribute_map());
        }

        debug!(event, schema_id = %schema.id, trace_id = %self.trace_id(), "finished event");
        Ok(())
    }

    /// Decodes the context resource (or an empty one) into the raw type
    /// registered for `schema`.
    fn resource_from_context(
        &self,
        schema: &Arc<Schema>,
        event: &str,
        ctx: &RequestContext,
    ) -> ExtensionResult<DomainResource> {
        let parse_error = |message: String| ExtensionError::ResourceParse {
            schema_id: schema.id.clone(),
            event: event.to_string(),
            message,
        };

        let empty = Default::default();
        let data = ctx.resource().unwrap_or(&empty);
        let raw = self
            .type_registry()
            .decode(&schema.id, data)
            .ok_or_else(|| parse_error(format!("no type registered for schema {}", schema.id)))?
            .map_err(|err| parse_error(err.to_string()))?;

        let base = ResourceBase::new(self, Arc::clone(schema));
        Ok(DomainResource::from_box(base, raw))
    }
}
