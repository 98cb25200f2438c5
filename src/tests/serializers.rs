use crate::serializers::{from_json, map_to_json, parse_json, to_json};
use crate::value::Value;
use serde_json::json;
use std::collections::HashMap;

#[test]
fn test_json_scalars_to_values() {
    assert_eq!(from_json(&json!(null)).unwrap(), Value::nil());
    assert_eq!(
        from_json(&json!(true)).unwrap(),
        Value::Symbol("TRUE".to_string())
    );
    assert_eq!(from_json(&json!(42)).unwrap(), Value::Integer(42));
    assert_eq!(from_json(&json!(2.5)).unwrap(), Value::Float(2.5));
    assert_eq!(
        from_json(&json!("abc")).unwrap(),
        Value::String("abc".to_string())
    );
}

#[test]
fn test_json_arrays_become_multifields() {
    assert_eq!(
        from_json(&json!([1, "two", 3.5])).unwrap(),
        Value::Multifield(vec![
            Value::Integer(1),
            Value::String("two".to_string()),
            Value::Float(3.5),
        ])
    );
}

#[test]
fn test_json_objects_are_rejected() {
    assert!(from_json(&json!({"a": 1})).is_err());
}

#[test]
fn test_parse_json_text() {
    assert_eq!(parse_json("[1, 2]").unwrap(), Value::Multifield(vec![
        Value::Integer(1),
        Value::Integer(2),
    ]));
    assert!(parse_json("not json").is_err());
}

#[test]
fn test_values_to_json() {
    assert_eq!(to_json(&Value::Integer(1)), json!(1));
    assert_eq!(to_json(&Value::Float(2.5)), json!(2.5));
    assert_eq!(to_json(&Value::String("s".to_string())), json!("s"));
    assert_eq!(to_json(&Value::Symbol("TRUE".to_string())), json!(true));
    assert_eq!(to_json(&Value::Symbol("FALSE".to_string())), json!(false));
    assert_eq!(to_json(&Value::nil()), json!(null));
    assert_eq!(to_json(&Value::Symbol("red".to_string())), json!("red"));
    assert_eq!(
        to_json(&Value::InstanceName("gen1".to_string())),
        json!("[gen1]")
    );
    assert_eq!(to_json(&Value::FactAddress(3)), json!(3));
}

#[test]
fn test_non_finite_floats_serialize_as_null() {
    assert_eq!(to_json(&Value::Float(f64::NAN)), json!(null));
}

#[test]
fn test_map_to_json_object() {
    let mut map = HashMap::new();
    map.insert("count".to_string(), Value::Integer(2));
    map.insert("label".to_string(), Value::nil());
    let object = map_to_json(&map);
    assert_eq!(object, json!({"count": 2, "label": null}));
}
