use hookwire_model::{
    AttributeMap, Json, MarshalError, Marshaler, Property, RawResource, RawResourceType, Schema,
    raw_resource,
};
use hookwire_types::{NullInt, NullString};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

raw_resource! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Subnet {
        #[db = "cidr"]
        pub cidr: String,
        #[db = "gateway"]
        pub gateway: NullString,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Labels {
    pub owner: String,
    pub tier: u8,
}

raw_resource! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Network {
        #[db = "id"]
        pub id: String,
        #[db = "name"]
        pub name: String,
        #[db = "description"]
        pub description: NullString,
        #[db = "size"]
        pub size: i32,
        #[db = "quota"]
        pub quota: NullInt,
        #[db = "shared"]
        pub shared: bool,
        #[db = "ratio"]
        pub ratio: f64,
        #[db = "subnets"]
        pub subnets: Vec<Subnet>,
        #[db = "primary_subnet"]
        pub primary_subnet: Option<Subnet>,
        #[db = "labels"]
        pub labels: Json<Labels>,
    }
}

raw_resource! {
    #[derive(Debug, Default)]
    pub struct Stray {
        #[db = "id"]
        pub id: String,
        #[db = "not_in_schema"]
        pub extra: String,
    }
}

fn network_schema() -> Schema {
    Schema::new("network")
        .with_property(Property::string("id"))
        .with_property(Property::string("name"))
        .with_property(Property::string("description"))
        .with_property(Property::integer("size"))
        .with_property(Property::integer("quota"))
        .with_property(Property::boolean("shared"))
        .with_property(Property::number("ratio"))
        .with_property(Property::array("subnets"))
        .with_property(Property::object("primary_subnet"))
        .with_property(Property::object("labels"))
}

fn map(value: Value) -> AttributeMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn sample_network() -> Network {
    Network {
        id: "net-1".into(),
        name: "backbone".into(),
        description: NullString::some("core network".into()),
        size: 24,
        quota: NullInt::none(),
        shared: true,
        ratio: 0.5,
        subnets: vec![Subnet {
            cidr: "10.0.0.0/24".into(),
            gateway: NullString::some("10.0.0.1".into()),
        }],
        primary_subnet: None,
        labels: Json(Labels {
            owner: "ops".into(),
            tier: 2,
        }),
    }
}

// ── Encoding ─────────────────────────────────────────────────────

#[test]
fn storage_tags_follow_declaration_order() {
    assert_eq!(
        Network::STORAGE_TAGS,
        &[
            "id",
            "name",
            "description",
            "size",
            "quota",
            "shared",
            "ratio",
            "subnets",
            "primary_subnet",
            "labels"
        ]
    );
    assert_eq!(sample_network().type_name(), "Network");
}

#[test]
fn to_attribute_map_emits_every_tag() {
    let encoded = sample_network().to_attribute_map();
    assert_eq!(
        Value::Object(encoded),
        json!({
            "id": "net-1",
            "name": "backbone",
            "description": "core network",
            "size": 24,
            "quota": null,
            "shared": true,
            "ratio": 0.5,
            "subnets": [{"cidr": "10.0.0.0/24", "gateway": "10.0.0.1"}],
            "primary_subnet": null,
            "labels": {"owner": "ops", "tier": 2}
        })
    );
}

// ── Decoding ─────────────────────────────────────────────────────

#[test]
fn decode_round_trips_through_schema() {
    let schema = network_schema();
    let marshaler = Marshaler::new(&schema);
    let original = sample_network();

    let decoded: Network = marshaler
        .resource_from_map(&marshaler.to_map(&original))
        .unwrap();

    assert_eq!(decoded, original);
}

#[test]
fn null_and_absent_keys_leave_nullable_fields_invalid() {
    let decoded = Network::from_attribute_map(&map(json!({
        "id": "net-2",
        "description": null
    })))
    .unwrap();

    assert_eq!(decoded.id, "net-2");
    assert!(!decoded.description.is_valid());
    assert!(!decoded.quota.is_valid());
    assert_eq!(decoded.name, "");
}

#[test]
fn null_clears_a_valid_nullable_field() {
    let mut network = sample_network();
    network
        .assign_from_map(&map(json!({"description": null})))
        .unwrap();
    assert!(network.description.get().is_none());
    assert_eq!(network.name, "backbone");
}

#[test]
fn floats_truncate_into_integer_fields() {
    let decoded = Network::from_attribute_map(&map(json!({
        "size": 7.9,
        "quota": -3.7
    })))
    .unwrap();

    assert_eq!(decoded.size, 7);
    assert_eq!(decoded.quota.into_option(), Some(-3));
}

#[test]
fn integer_out_of_range_is_reported_with_field() {
    let err = Network::from_attribute_map(&map(json!({"size": 1_099_511_627_776u64}))).unwrap_err();
    match err {
        MarshalError::Field { tag, source } => {
            assert_eq!(tag, "size");
            assert!(matches!(*source, MarshalError::OutOfRange { target: "i32", .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn wrong_kind_is_a_type_mismatch() {
    let err = Network::from_attribute_map(&map(json!({"shared": "yes"}))).unwrap_err();
    assert_eq!(err.to_string(), "field 'shared': expected bool, found string");
}

#[test]
fn nested_errors_carry_the_full_path() {
    let err = Network::from_attribute_map(&map(json!({
        "primary_subnet": {"cidr": 12}
    })))
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "field 'primary_subnet': field 'cidr': expected string, found integer"
    );
}

#[test]
fn update_resource_merges_into_existing_value() {
    let schema = network_schema();
    let marshaler = Marshaler::new(&schema);
    let mut network = sample_network();

    marshaler
        .update_resource(&mut network, &map(json!({"name": "edge", "size": 16})))
        .unwrap();

    assert_eq!(network.name, "edge");
    assert_eq!(network.size, 16);
    assert_eq!(network.id, "net-1");
}

#[test]
fn tag_without_schema_property_is_rejected() {
    let schema = network_schema();
    let err = Marshaler::new(&schema)
        .resource_from_map::<Stray>(&AttributeMap::new())
        .unwrap_err();

    assert!(matches!(
        err,
        MarshalError::UnknownProperty { ref tag, ref schema_id, .. }
            if tag == "not_in_schema" && schema_id == "network"
    ));
}

#[test]
fn works_through_trait_objects() {
    let mut boxed: Box<dyn RawResource> = Box::new(Subnet::default());
    boxed
        .assign_from_map(&map(json!({"cidr": "192.168.0.0/16"})))
        .unwrap();

    let subnet = boxed.as_any().downcast_ref::<Subnet>().unwrap();
    assert_eq!(subnet.cidr, "192.168.0.0/16");
    assert!(!subnet.gateway.is_valid());
}

// ── Properties ───────────────────────────────────────────────────

fn arb_null_string() -> impl Strategy<Value = NullString> {
    proptest::option::of("[a-z0-9 ]{0,12}").prop_map(NullString::from)
}

fn arb_subnet() -> impl Strategy<Value = Subnet> {
    ("[0-9./]{1,18}", arb_null_string()).prop_map(|(cidr, gateway)| Subnet { cidr, gateway })
}

proptest! {
    #[test]
    fn encode_decode_preserves_network(
        id in "[a-z0-9-]{1,16}",
        name in ".{0,24}",
        description in arb_null_string(),
        size in any::<i32>(),
        quota in proptest::option::of(any::<i64>()),
        shared in any::<bool>(),
        ratio in -1.0e6f64..1.0e6,
        subnets in proptest::collection::vec(arb_subnet(), 0..4),
        primary_subnet in proptest::option::of(arb_subnet()),
        owner in "[a-z]{0,8}",
        tier in any::<u8>(),
    ) {
        let original = Network {
            id,
            name,
            description,
            size,
            quota: NullInt::from(quota),
            shared,
            ratio,
            subnets,
            primary_subnet,
            labels: Json(Labels { owner, tier }),
        };

        let decoded = Network::from_attribute_map(&original.to_attribute_map()).unwrap();
        prop_assert_eq!(decoded, original);
    }
}
