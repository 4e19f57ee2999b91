//! The extension runtime.
//!
//! An [`Environment`] loads extension modules from an [`ExtensionCatalog`],
//! runs their initializers on [`start`](Environment::start) and serves
//! capabilities and event dispatch to request workers. Workers that run
//! concurrently each take an isolated [`Clone`] of the environment: clones
//! share the registries and hooks but carry their own trace id.

use crate::auth::Auth;
use crate::config::{EnvironmentConfig, ExtensionConfig};
use crate::context::RequestContext;
use crate::core_capability::Core;
use crate::database::DatabaseHandle;
use crate::error::{ExtensionError, ExtensionResult, HandlerError};
use crate::logger::Logger;
use crate::registry::{HandlerRegistry, Registrar, TypeRegistry};
use crate::schema::Schemas;
use hookwire_model::SchemaRegistry;
use hookwire_storage::{Database, DbOptions};
use hookwire_types::TraceId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Called before initializers run; a failure aborts the start.
pub type BeforeStartHook = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Called after the environment stopped.
pub type AfterStopHook = Arc<dyn Fn() + Send + Sync>;

/// An extension: an initializer that registers handlers and types.
pub trait ExtensionModule: Send + Sync {
    fn init(&self, registrar: &mut Registrar) -> Result<(), HandlerError>;
}

impl<F> ExtensionModule for F
where
    F: Fn(&mut Registrar) -> Result<(), HandlerError> + Send + Sync,
{
    fn init(&self, registrar: &mut Registrar) -> Result<(), HandlerError> {
        self(registrar)
    }
}

/// Extension modules available for loading, keyed by url.
#[derive(Clone, Default)]
pub struct ExtensionCatalog {
    modules: HashMap<String, Arc<dyn ExtensionModule>>,
}

impl fmt::Debug for ExtensionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut urls: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        urls.sort_unstable();
        f.debug_struct("ExtensionCatalog").field("modules", &urls).finish()
    }
}

impl ExtensionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, url: &str, module: impl ExtensionModule + 'static) -> Self {
        self.register(url, module);
        self
    }

    /// Adds a module, replacing any previous one with the same url.
    pub fn register(&mut self, url: &str, module: impl ExtensionModule + 'static) {
        self.modules.insert(url.to_string(), Arc::new(module));
    }

    pub fn get(&self, url: &str) -> Option<Arc<dyn ExtensionModule>> {
        self.modules.get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.modules.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Outcome of [`Environment::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    AlreadyLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Built, not started yet.
    Created,
    Started,
    Stopped,
}

/// Extension runtime environment.
pub struct Environment {
    name: Arc<str>,
    catalog: Arc<ExtensionCatalog>,
    // load order
    modules: Vec<(String, Arc<dyn ExtensionModule>)>,
    before_start: Option<BeforeStartHook>,
    after_stop: Option<AfterStopHook>,
    schemas: Arc<SchemaRegistry>,
    database: Option<Arc<dyn Database>>,
    db_options: Option<DbOptions>,
    handlers: Arc<HandlerRegistry>,
    types: Arc<TypeRegistry>,
    trace_id: TraceId,
    state: LifecycleState,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modules: Vec<&str> = self.modules.iter().map(|(url, _)| url.as_str()).collect();
        f.debug_struct("Environment")
            .field("name", &self.name)
            .field("modules", &modules)
            .field("trace_id", &self.trace_id)
            .field("state", &self.state)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

impl Clone for Environment {
    /// An isolated copy: same registries, hooks and database, fresh trace id.
    fn clone(&self) -> Self {
        Self {
            trace_id: TraceId::new(),
            ..self.share()
        }
    }
}

impl Environment {
    /// A copy that keeps this environment's trace id.
    pub(crate) fn share(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            catalog: Arc::clone(&self.catalog),
            modules: self.modules.clone(),
            before_start: self.before_start.clone(),
            after_stop: self.after_stop.clone(),
            schemas: Arc::clone(&self.schemas),
            database: self.database.clone(),
            db_options: self.db_options,
            handlers: Arc::clone(&self.handlers),
            types: Arc::clone(&self.types),
            trace_id: self.trace_id,
            state: self.state,
        }
    }

    pub fn new(name: &str, schemas: impl Into<Arc<SchemaRegistry>>) -> Self {
        Self {
            name: Arc::from(name),
            catalog: Arc::new(ExtensionCatalog::new()),
            modules: Vec::new(),
            before_start: None,
            after_stop: None,
            schemas: schemas.into(),
            database: None,
            db_options: None,
            handlers: Arc::new(HandlerRegistry::new()),
            types: Arc::new(TypeRegistry::new()),
            trace_id: TraceId::new(),
            state: LifecycleState::Created,
        }
    }

    /// Builds an environment named and tuned by `config`.
    pub fn from_config(
        config: &EnvironmentConfig,
        schemas: impl Into<Arc<SchemaRegistry>>,
        catalog: ExtensionCatalog,
    ) -> Self {
        Self::new(&config.name, schemas)
            .with_catalog(catalog)
            .with_db_options(config.database.db_options())
    }

    pub fn with_catalog(mut self, catalog: ExtensionCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_database(mut self, database: Arc<dyn Database>) -> Self {
        self.database = Some(database);
        self
    }

    /// Overrides the options reported by the database.
    pub fn with_db_options(mut self, options: DbOptions) -> Self {
        self.db_options = Some(options);
        self
    }

    pub fn with_before_start_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.before_start = Some(Arc::new(hook));
        self
    }

    pub fn with_after_stop_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.after_stop = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Urls of the loaded modules, in load order.
    pub fn loaded_modules(&self) -> Vec<&str> {
        self.modules.iter().map(|(url, _)| url.as_str()).collect()
    }

    // ================================================================
    // Lifecycle
    // ================================================================

    /// Adds the module at `url` to the environment. Loading a url twice is a
    /// no-op reported as [`LoadStatus::AlreadyLoaded`].
    pub fn load(&mut self, url: &str) -> ExtensionResult<LoadStatus> {
        debug!(environment = %self.name, url, "loading extension");

        if self.modules.iter().any(|(loaded, _)| loaded == url) {
            warn!(environment = %self.name, url, "extension already loaded");
            return Ok(LoadStatus::AlreadyLoaded);
        }

        let module = self
            .catalog
            .get(url)
            .ok_or_else(|| ExtensionError::ModuleNotFound(url.to_string()))?;
        self.modules.push((url.to_string(), module));
        Ok(LoadStatus::Loaded)
    }

    /// Loads and starts every configured extension whose path pattern
    /// matches `path`.
    pub fn load_extensions_for_path(
        &mut self,
        extensions: &[ExtensionConfig],
        path: &str,
    ) -> ExtensionResult<()> {
        for extension in extensions {
            if extension.code_type != crate::CODE_TYPE || !extension.matches(path) {
                continue;
            }
            let url = extension.url.trim_start_matches("file://");
            if url.is_empty() {
                warn!(extension_id = %extension.id, "ignoring extension without url");
                continue;
            }
            if self.load(url)? == LoadStatus::Loaded {
                self.start()?;
            }
        }
        Ok(())
    }

    /// Runs every module initializer and publishes the resulting registries.
    ///
    /// Registries are rebuilt from scratch, so restarting never duplicates
    /// registrations. On failure the previous registries stay in place.
    pub fn start(&mut self) -> ExtensionResult<()> {
        if self.modules.is_empty() {
            debug!(environment = %self.name, "environment is empty");
            self.state = LifecycleState::Started;
            return Ok(());
        }

        debug!(environment = %self.name, "starting environment");

        if let Some(hook) = &self.before_start {
            debug!(environment = %self.name, "calling before start hook");
            hook().map_err(|source| {
                error!(environment = %self.name, error = %source, "before start hook failed");
                ExtensionError::BeforeStart {
                    environment: self.name.to_string(),
                    source,
                }
            })?;
        }

        self.trace_id = TraceId::new();
        let mut registrar = Registrar::new(Arc::clone(&self.schemas), self.base_logger());

        for (url, module) in &self.modules {
            module.init(&mut registrar).map_err(|source| {
                error!(environment = %self.name, url = %url, error = %source, "failed to start extension");
                ExtensionError::Initialization {
                    module: url.clone(),
                    source,
                }
            })?;
        }

        let (handlers, types) = registrar.finish();
        self.handlers = Arc::new(handlers);
        self.types = Arc::new(types);
        self.state = LifecycleState::Started;

        info!(
            environment = %self.name,
            trace_id = %self.trace_id,
            modules = self.modules.len(),
            handlers = self.handlers.len(),
            "environment started"
        );
        Ok(())
    }

    /// Stops the environment; capabilities are unavailable until restarted.
    pub fn stop(&mut self) {
        info!(environment = %self.name, "stop environment");
        self.state = LifecycleState::Stopped;

        if let Some(hook) = &self.after_stop {
            debug!(environment = %self.name, "calling after stop hook");
            hook();
        }
    }

    /// Stops then starts the environment.
    pub fn reset(&mut self) -> ExtensionResult<()> {
        info!(environment = %self.name, "reset environment");
        self.stop();
        self.start()
    }

    /// Every event name is accepted.
    pub fn is_event_handled(&self, _event: &str, _ctx: &RequestContext) -> bool {
        true
    }

    // ================================================================
    // Capabilities
    // ================================================================

    pub(crate) fn ensure_running(&self) -> ExtensionResult<()> {
        match self.state {
            LifecycleState::Started => Ok(()),
            LifecycleState::Created => Err(ExtensionError::NotStarted(self.name.to_string())),
            LifecycleState::Stopped => Err(ExtensionError::Stopped(self.name.to_string())),
        }
    }

    pub fn logger(&self) -> ExtensionResult<Logger> {
        self.ensure_running()?;
        Ok(self.base_logger())
    }

    pub fn schemas(&self) -> ExtensionResult<Schemas<'_>> {
        self.ensure_running()?;
        Ok(Schemas::new(self))
    }

    pub fn core(&self) -> ExtensionResult<Core<'_>> {
        self.ensure_running()?;
        Ok(Core::new(self))
    }

    pub fn auth(&self) -> ExtensionResult<Auth> {
        self.ensure_running()?;
        Ok(Auth)
    }

    pub fn database(&self) -> ExtensionResult<DatabaseHandle> {
        self.ensure_running()?;
        let database = self
            .database
            .as_ref()
            .ok_or_else(|| ExtensionError::NoDatabase(self.name.to_string()))?;
        let options = self.db_options.unwrap_or_else(|| database.options());
        Ok(DatabaseHandle::new(Arc::clone(database), options))
    }

    pub(crate) fn base_logger(&self) -> Logger {
        Logger::new(Arc::clone(&self.name), self.trace_id)
    }

    pub(crate) fn schema_registry(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub(crate) fn type_registry(&self) -> &TypeRegistry {
        &self.types
    }

    pub(crate) fn handler_registry(&self) -> &HandlerRegistry {
        &self.handlers
    }
}
