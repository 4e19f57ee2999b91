use hookwire_model::{Action, ModelError, Property, Schema, SchemaRegistry};
use pretty_assertions::assert_eq;
use serde_json::json;

fn network() -> Schema {
    Schema::new("network")
        .with_property(Property::string("id"))
        .with_property(Property::string("name"))
        .with_property(Property::string("status").with_default(json!("ACTIVE")))
        .with_action(Action::new("reboot"))
}

fn port() -> Schema {
    Schema::new("port")
        .with_property(Property::string("id"))
        .with_property(Property::string("network_id").with_relation("network", false))
        .with_parent("network", true)
}

fn floating_ip() -> Schema {
    Schema::new("floating_ip")
        .with_property(Property::string("id"))
        .with_property(Property::string("network_id").with_relation("network", true))
}

// ── Schema ───────────────────────────────────────────────────────

#[test]
fn property_lookup() {
    let schema = network();
    assert_eq!(schema.property("name").unwrap().property_type, "string");
    assert!(schema.property("missing").is_none());
}

#[test]
fn property_by_id_reports_missing() {
    let err = network().property_by_id("missing").unwrap_err();
    assert!(matches!(
        err,
        ModelError::UnknownProperty { ref schema_id, ref property_id }
            if schema_id == "network" && property_id == "missing"
    ));
}

#[test]
fn custom_actions() {
    let schema = network();
    assert!(schema.is_custom_action("reboot"));
    assert!(!schema.is_custom_action("pre_create"));
}

#[test]
fn schema_deserializes_from_json() {
    let schema: Schema = serde_json::from_value(json!({
        "id": "network",
        "properties": [
            {"id": "id", "type": "string"},
            {"id": "size", "type": "integer", "default": 1}
        ],
        "actions": [{"id": "reboot"}],
        "extends": ["base"]
    }))
    .unwrap();

    assert_eq!(schema.properties.len(), 2);
    assert_eq!(schema.property("size").unwrap().default, Some(json!(1)));
    assert!(schema.is_custom_action("reboot"));
    assert!(schema.extends_schema("base"));
    assert_eq!(schema.parent, None);
}

// ── Registry ─────────────────────────────────────────────────────

#[test]
fn registry_preserves_load_order() {
    let registry = SchemaRegistry::from_schemas([port(), network(), floating_ip()]).unwrap();
    let ids: Vec<&str> = registry.ordered().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["port", "network", "floating_ip"]);
    assert_eq!(registry.len(), 3);
}

#[test]
fn registry_rejects_duplicates() {
    let err = SchemaRegistry::from_schemas([network(), network()]).unwrap_err();
    assert!(matches!(err, ModelError::DuplicateSchema(ref id) if id == "network"));
}

#[test]
fn registry_lookup() {
    let registry = SchemaRegistry::from_schemas([network()]).unwrap();
    assert!(registry.contains("network"));
    assert_eq!(registry.get("network").unwrap().id, "network");
    assert!(registry.get("port").is_none());
    assert!(matches!(registry.require("port"), Err(ModelError::UnknownSchema(_))));
}

#[test]
fn relations_use_parent_cascade_for_children() {
    let registry = SchemaRegistry::from_schemas([network(), port(), floating_ip()]).unwrap();
    let relations = registry.relations("network");

    assert_eq!(relations.len(), 2);
    assert_eq!(relations[0].schema_id, "port");
    assert_eq!(relations[0].property_id, "network_id");
    // property says no cascade, parent relation says cascade
    assert!(relations[0].on_delete_cascade);
    assert_eq!(relations[1].schema_id, "floating_ip");
    assert!(relations[1].on_delete_cascade);
}

#[test]
fn relations_of_unreferenced_schema_are_empty() {
    let registry = SchemaRegistry::from_schemas([network(), port()]).unwrap();
    assert!(registry.relations("port").is_empty());
}

#[test]
fn derived_schemas() {
    let base = Schema::new("base").with_property(Property::string("id"));
    let child = Schema::new("child").extending("base");
    let other = Schema::new("other");
    let registry = SchemaRegistry::from_schemas([base, child, other]).unwrap();

    let derived = registry.derived_schemas("base");
    assert_eq!(derived.len(), 1);
    assert_eq!(derived[0].id, "child");
    assert!(registry.derived_schemas("child").is_empty());
}
