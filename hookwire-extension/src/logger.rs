//! Logger capability.

use hookwire_types::TraceId;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Log handle given to extensions.
///
/// Every record carries the environment name and trace id, plus the schema
/// id when obtained through a resource.
#[derive(Debug, Clone)]
pub struct Logger {
    environment: Arc<str>,
    trace_id: TraceId,
    schema_id: Option<Arc<str>>,
}

impl Logger {
    pub(crate) fn new(environment: Arc<str>, trace_id: TraceId) -> Self {
        Self {
            environment,
            trace_id,
            schema_id: None,
        }
    }

    /// A logger that also stamps `schema_id`.
    pub fn for_schema(&self, schema_id: &str) -> Self {
        Self {
            schema_id: Some(Arc::from(schema_id)),
            ..self.clone()
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    fn schema(&self) -> &str {
        self.schema_id.as_deref().unwrap_or("")
    }

    pub fn debug(&self, message: impl Display) {
        debug!(
            environment = %self.environment,
            trace_id = %self.trace_id,
            schema_id = self.schema(),
            "{message}"
        );
    }

    pub fn info(&self, message: impl Display) {
        info!(
            environment = %self.environment,
            trace_id = %self.trace_id,
            schema_id = self.schema(),
            "{message}"
        );
    }

    pub fn warning(&self, message: impl Display) {
        warn!(
            environment = %self.environment,
            trace_id = %self.trace_id,
            schema_id = self.schema(),
            "{message}"
        );
    }

    pub fn error(&self, message: impl Display) {
        error!(
            environment = %self.environment,
            trace_id = %self.trace_id,
            schema_id = self.schema(),
            "{message}"
        );
    }
}
