use hookwire_types::{CustomEvent, Error, ResourceEvent, TraceId};
use std::str::FromStr;

#[test]
fn wire_names() {
    assert_eq!(ResourceEvent::PreCreate.as_str(), "pre_create");
    assert_eq!(ResourceEvent::PostDelete.to_string(), "post_delete");
}

#[test]
fn parse_every_event() {
    for event in ResourceEvent::ALL {
        assert_eq!(ResourceEvent::from_str(event.as_str()).unwrap(), event);
    }
}

#[test]
fn parse_unknown_event_fails() {
    assert!(ResourceEvent::from_str("reboot").is_err());
}

#[test]
fn serde_uses_wire_names() {
    let json = serde_json::to_string(&ResourceEvent::PreUpdate).unwrap();
    assert_eq!(json, r#""pre_update""#);
}

#[test]
fn pre_events() {
    assert!(ResourceEvent::PreDelete.is_pre());
    assert!(!ResourceEvent::PostDelete.is_pre());
}

#[test]
fn custom_event_conversions() {
    let event = CustomEvent::from("reboot");
    assert_eq!(event.as_str(), "reboot");
    assert_eq!(event, CustomEvent::new(String::from("reboot")));
}

#[test]
fn trace_ids_are_unique() {
    assert_ne!(TraceId::new(), TraceId::new());
}

#[test]
fn trace_id_display_and_parse() {
    let id = TraceId::new();
    let parsed = TraceId::parse(&id.to_string()).unwrap();
    assert_eq!(parsed, id);
    assert!(TraceId::from_str("garbage").is_err());
}

#[test]
fn invalid_trace_id_reports_crate_error() {
    let err = TraceId::parse("not-a-trace").unwrap_err();
    assert!(matches!(err, Error::InvalidUuid(_)));
    assert!(err.to_string().starts_with("invalid UUID"));
}
