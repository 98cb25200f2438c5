use crate::defclass;
use crate::shape::{FieldValue, Fielded, Shaped, SlotKind};
use crate::value::{Symbol, Value};

defclass! {
    pub struct Reading {
        sensor: Symbol,
        celsius: f64,
        count: i64,
        label: Option<String>,
        samples: Vec<i64>,
        ok: bool,
        raw: Value,
    }
}

defclass! {
    pub struct Renamed("SensorReading") {
        device_id("DeviceId"): String,
    }
}

defclass! {
    pub struct Inner {
        depth: i64,
    }
}

defclass! {
    pub struct Outer {
        name: String,
        inner: Inner,
    }
}

defclass! {
    pub struct Node {
        tag: Symbol,
        next: Option<Box<Node>>,
    }
}

#[test]
fn test_declaration_order_becomes_slot_order() {
    let names: Vec<&str> = Reading::shape()
        .slot_specs()
        .iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(
        names,
        vec!["sensor", "celsius", "count", "label", "samples", "ok", "raw"]
    );
}

#[test]
fn test_field_types_choose_slot_kinds() {
    let specs = Reading::shape().slot_specs();
    assert_eq!(specs[0].kind, SlotKind::Symbol);
    assert_eq!(specs[1].kind, SlotKind::Float);
    assert_eq!(specs[2].kind, SlotKind::Integer);
    assert_eq!(specs[3].kind, SlotKind::Text);
    assert_eq!(specs[4].kind, SlotKind::Integer);
    assert_eq!(specs[5].kind, SlotKind::Symbol);
    assert_eq!(specs[6].kind, SlotKind::Any);
}

#[test]
fn test_option_and_vec_flags() {
    let specs = Reading::shape().slot_specs();
    assert!(specs[3].optional);
    assert!(!specs[3].multi);
    assert!(specs[4].multi);
    assert!(!specs[4].optional);
}

#[test]
fn test_class_and_slot_renames() {
    assert_eq!(Renamed::class_name(), "SensorReading");
    assert_eq!(Renamed::shape().slot_specs()[0].name, "DeviceId");
}

#[test]
fn test_nested_class_slot_references_child_shape() {
    let specs = Outer::shape().slot_specs();
    assert_eq!(specs[1].kind, SlotKind::Class(Inner::shape()));
    assert_eq!(specs[1].kind.referenced_class(), Some("Inner"));
}

#[test]
fn test_cyclic_shape_resolves() {
    // slot lists are computed lazily, so self reference terminates
    let specs = Node::shape().slot_specs();
    assert_eq!(specs[1].kind.referenced_class(), Some("Node"));
    assert!(specs[1].optional);
}

#[test]
fn test_field_access_by_slot_name() {
    let reading = Reading {
        sensor: Symbol::new("thermo"),
        celsius: 21.5,
        count: 3,
        label: None,
        samples: vec![20, 21, 22],
        ok: true,
        raw: Value::nil(),
    };

    assert!(matches!(
        reading.field("sensor").unwrap(),
        FieldValue::Unit(Value::Symbol(s)) if s == "thermo"
    ));
    assert!(matches!(reading.field("label").unwrap(), FieldValue::Absent));
    assert!(matches!(
        reading.field("samples").unwrap(),
        FieldValue::List(values) if values.len() == 3
    ));
    assert!(reading.field("missing").is_err());
}

#[test]
fn test_set_field_converts_and_ignores_unknown_slots() {
    let mut reading = Reading::default();
    reading
        .set_field("count", FieldValue::Unit(Value::Integer(5)))
        .unwrap();
    assert_eq!(reading.count, 5);

    // engine floats with zero fraction land in integer fields
    reading
        .set_field("count", FieldValue::Unit(Value::Float(6.0)))
        .unwrap();
    assert_eq!(reading.count, 6);
    assert!(reading
        .set_field("count", FieldValue::Unit(Value::Float(6.5)))
        .is_err());

    // unknown slots are ignored, not errors
    reading
        .set_field("missing", FieldValue::Unit(Value::Integer(1)))
        .unwrap();
}

#[test]
fn test_renamed_slots_drive_field_access() {
    let renamed = Renamed {
        device_id: "abc".to_string(),
    };
    assert!(renamed.field("DeviceId").is_ok());
    assert!(renamed.field("device_id").is_err());
}
