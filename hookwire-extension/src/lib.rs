//! Extension runtime for hookwire.
//!
//! Extensions are compiled-in modules that register lifecycle handlers
//! against resource schemas. The runtime dispatches events to them in a
//! deterministic order and wraps every write in pre/post events.
//!
//! # Architecture
//!
//! - [`Environment`] owns the loaded modules, the handler and type
//!   registries, and the start/stop/reset/clone lifecycle
//! - [`Registrar`] is handed to each module's initializer; registration is
//!   only possible there, so registries are read-only once started
//! - [`Environment::handle_event`] dispatches schema handlers first, then
//!   generic handlers, in ascending priority, failing fast
//! - [`SchemaHandle`] performs List/Fetch/Create/Update/Delete/Count against
//!   the transaction carried by a [`RequestContext`]
//! - Capabilities ([`Logger`], [`Schemas`], [`Core`], [`Auth`],
//!   [`DatabaseHandle`]) are reached through the environment

mod auth;
mod config;
mod context;
mod core_capability;
mod database;
mod dispatch;
mod environment;
mod error;
mod logger;
mod registry;
mod resource;
mod schema;

pub use auth::{Auth, Authorization, Role};
pub use config::{ConfigError, DatabaseConfig, EnvironmentConfig, ExtensionConfig};
pub use context::RequestContext;
pub use core_capability::Core;
pub use database::DatabaseHandle;
pub use environment::{
    AfterStopHook, BeforeStartHook, Environment, ExtensionCatalog, ExtensionModule,
    LifecycleState, LoadStatus,
};
pub use error::{ErrorCode, ExtensionError, ExtensionResult, HandlerError};
pub use logger::Logger;
pub use registry::{
    Handler, HandlerRegistry, PrioritizedHandlers, Registrar, SchemaHandler, SchemaRegistrar,
    TypeRegistry,
};
pub use resource::{DomainResource, Resource, ResourceBase};
pub use schema::{SchemaHandle, Schemas};

/// Code type of extensions this runtime executes.
pub const CODE_TYPE: &str = "native";
