//! Shared fixtures for runtime tests.

#![allow(dead_code)]

use hookwire_extension::{Environment, ExtensionCatalog, HandlerError, Registrar, RequestContext};
use hookwire_model::{Action, AttributeMap, Property, Schema, SchemaRegistry, raw_resource};
use hookwire_storage::{Database, MemoryDatabase};
use hookwire_types::{NullInt, NullString};
use serde_json::Value;
use std::sync::{Arc, Mutex};

raw_resource! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Network {
        #[db = "id"]
        pub id: String,
        #[db = "name"]
        pub name: String,
        #[db = "description"]
        pub description: NullString,
        #[db = "status"]
        pub status: String,
        #[db = "size"]
        pub size: NullInt,
    }
}

raw_resource! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Port {
        #[db = "id"]
        pub id: String,
        #[db = "name"]
        pub name: String,
        #[db = "network_id"]
        pub network_id: String,
    }
}

pub const MODULE_URL: &str = "network_extension";

pub fn network_schema() -> Schema {
    Schema::new("network")
        .with_property(Property::string("id"))
        .with_property(Property::string("name"))
        .with_property(Property::string("description"))
        .with_property(Property::string("status").with_default(Value::from("ACTIVE")))
        .with_property(Property::integer("size"))
        .with_action(Action::new("reboot"))
}

pub fn port_schema() -> Schema {
    Schema::new("port")
        .with_property(Property::string("id"))
        .with_property(Property::string("name"))
        .with_property(Property::string("network_id").with_relation("network", false))
        .with_parent("network", true)
}

pub fn schema_registry() -> SchemaRegistry {
    SchemaRegistry::from_schemas([network_schema(), port_schema()]).unwrap()
}

pub fn map(value: Value) -> AttributeMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub fn network(id: &str, name: &str) -> Network {
    Network {
        id: id.into(),
        name: name.into(),
        ..Network::default()
    }
}

/// Installs a test log writer once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Ordered log of handler invocations shared between handlers and the test.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// An environment over a fresh memory database with one module loaded from
/// `init`, already started.
pub fn started_env<F>(init: F) -> (Environment, MemoryDatabase)
where
    F: Fn(&mut Registrar) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    init_tracing();
    let db = MemoryDatabase::new();
    let catalog = ExtensionCatalog::new().with_module(MODULE_URL, init);
    let mut env = Environment::new("test", schema_registry())
        .with_catalog(catalog)
        .with_database(Arc::new(db.clone()));
    env.load(MODULE_URL).unwrap();
    env.start().unwrap();
    (env, db)
}

/// Registers the raw types of both fixture schemas.
pub fn register_types(registrar: &mut Registrar) -> Result<(), HandlerError> {
    registrar.schema("network")?.register_raw_type::<Network>()?;
    registrar.schema("port")?.register_raw_type::<Port>()?;
    Ok(())
}

/// A context carrying a fresh transaction of `db`.
pub fn tx_context(db: &MemoryDatabase) -> RequestContext {
    RequestContext::new().with_transaction(db.begin().unwrap())
}
