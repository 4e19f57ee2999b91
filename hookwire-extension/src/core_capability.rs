//! Core capability.

use crate::context::RequestContext;
use crate::environment::Environment;
use crate::error::ExtensionResult;

/// Lets extension code fire events through the environment's dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct Core<'env> {
    env: &'env Environment,
}

impl<'env> Core<'env> {
    pub(crate) fn new(env: &'env Environment) -> Self {
        Self { env }
    }

    /// Dispatches `event` exactly as [`Environment::handle_event`] does.
    pub fn trigger_event(&self, event: &str, ctx: &mut RequestContext) -> ExtensionResult<()> {
        self.env.handle_event(event, ctx)
    }
}
