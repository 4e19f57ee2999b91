mod common;

use common::{Recorder, init_tracing, schema_registry, started_env};
use hookwire_extension::{
    Environment, EnvironmentConfig, ExtensionCatalog, ExtensionConfig, ExtensionError,
    HandlerError, LifecycleState, LoadStatus, Registrar, RequestContext,
};
use hookwire_storage::{DbOptions, MemoryDatabase, Transaction};
use hookwire_types::TraceId;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// A module registering one `ping` handler that records `label`.
fn ping_module(
    recorder: &Recorder,
    label: &'static str,
) -> impl Fn(&mut Registrar) -> Result<(), HandlerError> + Send + Sync + 'static {
    let recorder = recorder.clone();
    move |registrar: &mut Registrar| {
        let recorder = recorder.clone();
        registrar.register_event_handler(
            "ping",
            move |_ctx: &mut RequestContext, _env: &Environment| {
                recorder.record(label);
                Ok(())
            },
            0,
        );
        Ok(())
    }
}

fn env_with(catalog: ExtensionCatalog) -> Environment {
    init_tracing();
    Environment::new("test", schema_registry()).with_catalog(catalog)
}

// ================================================================
// Loading
// ================================================================

#[test]
fn loading_twice_is_a_no_op() {
    let recorder = Recorder::default();
    let mut env = env_with(ExtensionCatalog::new().with_module("a", ping_module(&recorder, "a")));

    assert_eq!(env.load("a").unwrap(), LoadStatus::Loaded);
    assert_eq!(env.load("a").unwrap(), LoadStatus::AlreadyLoaded);
    env.start().unwrap();
    env.handle_event("ping", &mut RequestContext::new()).unwrap();

    assert_eq!(env.loaded_modules(), vec!["a"]);
    assert_eq!(recorder.entries(), vec!["a"]);
}

#[test]
fn loading_unknown_module_fails() {
    let mut env = env_with(ExtensionCatalog::new());

    let err = env.load("missing").unwrap_err();

    assert!(matches!(err, ExtensionError::ModuleNotFound(ref url) if url == "missing"));
    assert!(env.loaded_modules().is_empty());
}

#[test]
fn modules_initialize_in_load_order() {
    let recorder = Recorder::default();
    let catalog = ExtensionCatalog::new()
        .with_module("first", ping_module(&recorder, "first"))
        .with_module("second", ping_module(&recorder, "second"));
    let mut env = env_with(catalog);
    env.load("second").unwrap();
    env.load("first").unwrap();
    env.start().unwrap();

    env.handle_event("ping", &mut RequestContext::new()).unwrap();

    assert_eq!(recorder.entries(), vec!["second", "first"]);
}

#[test]
fn load_extensions_for_path_filters_configs() {
    let recorder = Recorder::default();
    let catalog = ExtensionCatalog::new()
        .with_module("networks", ping_module(&recorder, "networks"))
        .with_module("ports", ping_module(&recorder, "ports"))
        .with_module("foreign", ping_module(&recorder, "foreign"));
    let mut env = env_with(catalog);

    let mut foreign = ExtensionConfig::new("foreign", "foreign", "");
    foreign.code_type = "javascript".into();
    let configs = [
        ExtensionConfig::new("networks", "file://networks", "^/v2.0/networks"),
        ExtensionConfig::new("ports", "ports", "^/v2.0/ports"),
        ExtensionConfig::new("blank", "", ""),
        foreign,
    ];

    env.load_extensions_for_path(&configs, "/v2.0/networks/n1")
        .unwrap();

    assert_eq!(env.loaded_modules(), vec!["networks"]);
    assert_eq!(env.state(), LifecycleState::Started);
    env.handle_event("ping", &mut RequestContext::new()).unwrap();
    assert_eq!(recorder.entries(), vec!["networks"]);
}

#[test]
fn load_extensions_for_path_reports_missing_module() {
    let mut env = env_with(ExtensionCatalog::new());
    let configs = [ExtensionConfig::new("gone", "file://gone", "")];

    let err = env.load_extensions_for_path(&configs, "/any").unwrap_err();

    assert!(matches!(err, ExtensionError::ModuleNotFound(ref url) if url == "gone"));
}

// ================================================================
// Lifecycle
// ================================================================

#[test]
fn empty_environment_starts() {
    let mut env = env_with(ExtensionCatalog::new());
    assert_eq!(env.state(), LifecycleState::Created);

    env.start().unwrap();

    assert_eq!(env.state(), LifecycleState::Started);
    env.handle_event("anything", &mut RequestContext::new()).unwrap();
}

#[test]
fn unstarted_environment_rejects_dispatch_and_capabilities() {
    let mut env = env_with(ExtensionCatalog::new()).with_database(Arc::new(MemoryDatabase::new()));

    let err = env
        .handle_event("anything", &mut RequestContext::new())
        .unwrap_err();
    assert!(matches!(err, ExtensionError::NotStarted(ref name) if name == "test"));
    assert_eq!(err.to_string(), "environment 'test' is not started");
    assert!(matches!(env.logger(), Err(ExtensionError::NotStarted(_))));
    assert!(matches!(env.schemas(), Err(ExtensionError::NotStarted(_))));
    assert!(matches!(env.database(), Err(ExtensionError::NotStarted(_))));

    env.start().unwrap();
    assert!(env.logger().is_ok());
}

#[test]
fn reset_does_not_duplicate_handlers() {
    let recorder = Recorder::default();
    let (mut env, _db) = started_env(ping_module(&recorder, "ping"));
    let first_trace = env.trace_id();

    env.reset().unwrap();
    env.handle_event("ping", &mut RequestContext::new()).unwrap();

    assert_eq!(recorder.entries(), vec!["ping"]);
    assert_ne!(env.trace_id(), first_trace);
}

#[test]
fn failed_initializer_aborts_start() {
    let mut env = env_with(ExtensionCatalog::new().with_module(
        "broken",
        |_registrar: &mut Registrar| -> Result<(), HandlerError> {
            Err(HandlerError::internal("cannot reach quota service"))
        },
    ));
    env.load("broken").unwrap();

    let err = env.start().unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed to start extension 'broken': internal error: cannot reach quota service"
    );
    assert_eq!(env.state(), LifecycleState::Created);
}

#[test]
fn failed_before_start_hook_skips_initializers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut env = env_with(ExtensionCatalog::new().with_module(
        "counted",
        move |_registrar: &mut Registrar| -> Result<(), HandlerError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    ))
    .with_before_start_hook(|| anyhow::bail!("migrations pending"));
    env.load("counted").unwrap();

    let err = env.start().unwrap_err();

    assert!(matches!(err, ExtensionError::BeforeStart { .. }));
    assert!(err.to_string().contains("migrations pending"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn stop_runs_hook_and_disables_capabilities() {
    let stops = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&stops);
    let mut env = env_with(ExtensionCatalog::new())
        .with_after_stop_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .with_database(Arc::new(MemoryDatabase::new()));
    env.start().unwrap();

    env.stop();

    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert_eq!(env.state(), LifecycleState::Stopped);
    assert!(matches!(env.logger(), Err(ExtensionError::Stopped(_))));
    assert!(matches!(env.schemas(), Err(ExtensionError::Stopped(_))));
    assert!(matches!(env.core(), Err(ExtensionError::Stopped(_))));
    assert!(matches!(env.auth(), Err(ExtensionError::Stopped(_))));
    assert!(matches!(env.database(), Err(ExtensionError::Stopped(_))));

    env.start().unwrap();
    assert!(env.database().is_ok());
}

// ================================================================
// Clones
// ================================================================

#[test]
fn clone_shares_handlers_with_fresh_trace_id() {
    let recorder = Recorder::default();
    let (env, _db) = started_env(ping_module(&recorder, "ping"));

    let copy = env.clone();
    copy.handle_event("ping", &mut RequestContext::new()).unwrap();

    assert_ne!(copy.trace_id(), env.trace_id());
    assert_eq!(copy.state(), LifecycleState::Started);
    assert_eq!(copy.name(), env.name());
    assert_eq!(recorder.entries(), vec!["ping"]);
}

#[test]
fn stopping_a_clone_leaves_the_source_running() {
    let (env, _db) = started_env(|_registrar| Ok(()));

    let mut copy = env.clone();
    copy.stop();

    assert!(env.logger().is_ok());
    assert!(copy.logger().is_err());
}

#[test]
fn concurrent_clones_dispatch_independently() {
    let recorder = Recorder::default();
    let rec = recorder.clone();
    let (env, _db) = started_env(move |registrar| {
        let rec = rec.clone();
        registrar.register_event_handler(
            "work",
            move |ctx: &mut RequestContext, env: &Environment| {
                rec.record(env.trace_id().to_string());
                ctx.extras_mut()
                    .insert("trace_id".into(), env.trace_id().to_string().into());
                Ok(())
            },
            0,
        );
        Ok(())
    });

    let traces: Vec<String> = thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let worker = env.clone();
                scope.spawn(move || {
                    let mut ctx = RequestContext::new();
                    worker.handle_event("work", &mut ctx).unwrap();
                    assert_eq!(ctx.extras()["trace_id"], worker.trace_id().to_string());
                    worker.trace_id().to_string()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    let distinct: HashSet<&String> = traces.iter().collect();
    assert_eq!(distinct.len(), 8);
    assert_eq!(recorder.entries().len(), 8);
}

// ================================================================
// Capabilities
// ================================================================

#[test]
fn database_capability_requires_database() {
    let mut env = env_with(ExtensionCatalog::new());
    env.start().unwrap();

    assert!(matches!(env.database(), Err(ExtensionError::NoDatabase(ref name)) if name == "test"));
}

#[test]
fn database_options_prefer_override() {
    let reported = DbOptions {
        retry_tx_count: 2,
        retry_tx_interval: Duration::from_millis(50),
    };
    let overridden = DbOptions {
        retry_tx_count: 7,
        retry_tx_interval: Duration::from_millis(10),
    };
    let database = Arc::new(MemoryDatabase::new().with_options(reported));

    let mut env = env_with(ExtensionCatalog::new()).with_database(database.clone());
    env.start().unwrap();
    assert_eq!(env.database().unwrap().options(), reported);

    let mut env = env.with_db_options(overridden);
    env.start().unwrap();
    assert_eq!(env.database().unwrap().options(), overridden);
}

#[test]
fn database_capability_begins_transactions() {
    let (env, db) = started_env(|_registrar| Ok(()));

    let tx = env.database().unwrap().begin().unwrap();
    assert!(!tx.closed());
    tx.commit().unwrap();

    assert!(tx.closed());
    assert!(db.rows("network").is_empty());
}

#[test]
fn logger_carries_environment_and_trace() {
    let (env, _db) = started_env(|_registrar| Ok(()));

    let logger = env.logger().unwrap();
    logger.info("environment ready");

    assert_eq!(logger.environment(), "test");
    assert_eq!(logger.trace_id(), env.trace_id());
}

#[test]
fn from_config_applies_name_and_retry_options() {
    init_tracing();
    let config = EnvironmentConfig::from_toml_str(
        r#"
name = "network-service"

[database]
retry_tx_count = 3
retry_tx_interval_ms = 200
"#,
    )
    .unwrap();

    let mut env = Environment::from_config(&config, schema_registry(), ExtensionCatalog::new())
        .with_database(Arc::new(MemoryDatabase::new()));
    env.start().unwrap();

    assert_eq!(env.name(), "network-service");
    let options = env.database().unwrap().options();
    assert_eq!(options.retry_tx_count, 3);
    assert_eq!(options.retry_tx_interval, Duration::from_millis(200));
}

#[test]
fn trace_ids_are_unique() {
    let ids: HashSet<TraceId> = (0..100).map(|_| TraceId::new()).collect();
    assert_eq!(ids.len(), 100);
}
