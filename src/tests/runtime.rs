use crate::error::ClaspError;
use crate::runtime::{LocalRuntime, Runtime};
use crate::value::{Value, ValueKind};

fn runtime_with_point() -> LocalRuntime {
    let mut rt = LocalRuntime::new();
    rt.run("(defclass point (is-a USER) (slot x (type INTEGER)) (slot y (type FLOAT)) (multislot tags (type SYMBOL)))")
        .unwrap();
    rt
}

#[test]
fn test_defclass_records_schema() {
    let rt = runtime_with_point();
    let info = rt.class_info("point").unwrap();
    assert_eq!(info.name, "point");
    assert_eq!(info.slots.len(), 3);
    assert_eq!(info.slots[0].name, "x");
    assert_eq!(info.slots[0].kind, ValueKind::Integer);
    assert!(!info.slots[0].multi);
    assert!(info.slots[2].multi);
}

#[test]
fn test_deftemplate_records_schema() {
    let mut rt = LocalRuntime::new();
    rt.run("(deftemplate order (slot id (type INTEGER)) (multislot items))")
        .unwrap();
    let info = rt.template_info("order").unwrap();
    assert!(!info.implied);
    assert_eq!(info.slots[1].kind, ValueKind::Any);
}

#[test]
fn test_make_instance_auto_names() {
    let mut rt = runtime_with_point();
    let first = rt.eval("(make-instance of point (x 1))").unwrap();
    let second = rt.eval("(make-instance of point (x 2))").unwrap();
    assert_eq!(first, Value::InstanceName("gen1".to_string()));
    assert_eq!(second, Value::InstanceName("gen2".to_string()));
}

#[test]
fn test_make_instance_with_explicit_name() {
    let mut rt = runtime_with_point();
    let made = rt.eval("(make-instance [origin] of point (x 0) (y 0.0))").unwrap();
    assert_eq!(made, Value::InstanceName("origin".to_string()));
    assert_eq!(
        rt.eval("(class [origin])").unwrap(),
        Value::Symbol("point".to_string())
    );
}

#[test]
fn test_make_instance_enforces_slot_kinds() {
    let mut rt = runtime_with_point();
    let err = rt.eval("(make-instance of point (x \"one\"))").unwrap_err();
    assert!(matches!(err, ClaspError::Construction(_)));
    // integers satisfy float slots
    assert!(rt.eval("(make-instance of point (y 3))").is_ok());
    // but floats do not satisfy integer slots
    assert!(rt.eval("(make-instance of point (x 3.0))").is_err());
}

#[test]
fn test_make_instance_rejects_unknown_class_and_slot() {
    let mut rt = runtime_with_point();
    assert!(rt.eval("(make-instance of missing)").is_err());
    assert!(rt.eval("(make-instance of point (z 1))").is_err());
}

#[test]
fn test_send_get_and_put() {
    let mut rt = runtime_with_point();
    rt.eval("(make-instance [p] of point (x 7))").unwrap();
    assert_eq!(
        rt.eval("(send [p] get-x)").unwrap(),
        Value::Integer(7)
    );
    // unset slots read as nil
    assert!(rt.eval("(send [p] get-y)").unwrap().is_nil());

    rt.eval("(send [p] put-x 9)").unwrap();
    assert_eq!(rt.eval("(send [p] get-x)").unwrap(), Value::Integer(9));

    // putting no value unsets the slot
    rt.eval("(send [p] put-x)").unwrap();
    assert!(rt.eval("(send [p] get-x)").unwrap().is_nil());
}

#[test]
fn test_send_put_multislot_flattens() {
    let mut rt = runtime_with_point();
    rt.eval("(make-instance [p] of point)").unwrap();
    rt.eval("(send [p] put-tags a (create$ b c))").unwrap();
    assert_eq!(
        rt.eval("(send [p] get-tags)").unwrap(),
        Value::Multifield(vec![
            Value::Symbol("a".to_string()),
            Value::Symbol("b".to_string()),
            Value::Symbol("c".to_string()),
        ])
    );
}

#[test]
fn test_create_flattens_nested_multifields() {
    let mut rt = LocalRuntime::new();
    assert_eq!(
        rt.eval("(create$ 1 (create$ 2 3) 4)").unwrap(),
        Value::Multifield(vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Integer(3),
            Value::Integer(4),
        ])
    );
}

#[test]
fn test_ordered_fact_gets_implied_template() {
    let mut rt = LocalRuntime::new();
    let asserted = rt.eval("(assert (point-data 1 2.0 three))").unwrap();
    assert_eq!(asserted, Value::FactAddress(1));

    let info = rt.template_info("point-data").unwrap();
    assert!(info.implied);
    assert_eq!(info.slots.len(), 1);
    assert_eq!(info.slots[0].name, "implied");
    assert!(info.slots[0].multi);

    assert_eq!(
        rt.eval("(fact-slot-value 1 implied)").unwrap(),
        Value::Multifield(vec![
            Value::Integer(1),
            Value::Float(2.0),
            Value::Symbol("three".to_string()),
        ])
    );
}

#[test]
fn test_unordered_fact_by_template() {
    let mut rt = LocalRuntime::new();
    rt.run("(deftemplate order (slot id (type INTEGER)) (multislot items))")
        .unwrap();
    let asserted = rt.eval("(assert (order (id 12) (items a b)))").unwrap();
    assert_eq!(asserted, Value::FactAddress(1));
    assert_eq!(
        rt.eval("(fact-relation 1)").unwrap(),
        Value::Symbol("order".to_string())
    );
    assert_eq!(
        rt.eval("(fact-slot-value 1 id)").unwrap(),
        Value::Integer(12)
    );
    assert_eq!(
        rt.eval("(fact-slot-names 1)").unwrap(),
        Value::Multifield(vec![
            Value::Symbol("id".to_string()),
            Value::Symbol("items".to_string()),
        ])
    );
}

#[test]
fn test_fact_indices_are_not_reused() {
    let mut rt = LocalRuntime::new();
    rt.eval("(assert (a 1))").unwrap();
    rt.eval("(assert (b 2))").unwrap();
    rt.eval("(retract 1)").unwrap();
    assert_eq!(rt.eval("(assert (c 3))").unwrap(), Value::FactAddress(3));
}

#[test]
fn test_retract_missing_fact_is_invalid_reference() {
    let mut rt = LocalRuntime::new();
    assert!(matches!(
        rt.eval("(retract 9)").unwrap_err(),
        ClaspError::InvalidReference(_)
    ));
}

#[test]
fn test_unmake_instance() {
    let mut rt = runtime_with_point();
    rt.eval("(make-instance [p] of point)").unwrap();
    assert_eq!(
        rt.eval("(instance-existp [p])").unwrap(),
        Value::Symbol("TRUE".to_string())
    );
    rt.eval("(unmake-instance [p])").unwrap();
    assert_eq!(
        rt.eval("(instance-existp [p])").unwrap(),
        Value::Symbol("FALSE".to_string())
    );
    assert!(matches!(
        rt.eval("(unmake-instance [p])").unwrap_err(),
        ClaspError::InvalidReference(_)
    ));
}

#[test]
fn test_clear_resets_counters_but_keeps_functions() {
    let mut rt = runtime_with_point();
    rt.define(
        "answer",
        crate::bridge::Signature {
            params: vec![],
            variadic: None,
        },
        std::rc::Rc::new(|_| Ok(Some(Value::Integer(42)))),
    )
    .unwrap();
    rt.eval("(make-instance of point)").unwrap();
    rt.eval("(assert (a 1))").unwrap();

    rt.clear();
    assert!(rt.class_info("point").is_none());
    assert_eq!(rt.eval("(assert (a 1))").unwrap(), Value::FactAddress(1));
    assert_eq!(rt.eval("(answer)").unwrap(), Value::Integer(42));

    rt.run("(defclass point (is-a USER) (slot x (type INTEGER)))")
        .unwrap();
    assert_eq!(
        rt.eval("(make-instance of point)").unwrap(),
        Value::InstanceName("gen1".to_string())
    );
}

#[test]
fn test_unknown_function_is_rejected() {
    let mut rt = LocalRuntime::new();
    assert!(matches!(
        rt.eval("(no-such-fn 1)").unwrap_err(),
        ClaspError::Construction(_)
    ));
}
