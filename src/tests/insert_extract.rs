use crate::defclass;
use crate::env::Environment;
use crate::value::{Symbol, Value};
use std::collections::HashMap;

defclass! {
    pub struct Child {
        intval: Option<i64>,
    }
}

defclass! {
    pub struct Parent {
        str_val("Str"): String,
        child: Child,
    }
}

defclass! {
    pub struct Reading {
        sensor: Symbol,
        celsius: f64,
        label: Option<String>,
        samples: Vec<i64>,
        ok: bool,
    }
}

defclass! {
    pub struct Link {
        tag: Symbol,
        next: Option<Box<Link>>,
    }
}

#[test]
fn test_scalar_round_trip() {
    let env = Environment::new();
    let original = Reading {
        sensor: Symbol::new("thermo"),
        celsius: 21.5,
        label: Some("lab".to_string()),
        samples: vec![20, 21, 22],
        ok: true,
    };

    let handle = env.insert(&original).unwrap();
    let mut copy = Reading::default();
    env.extract(&handle, &mut copy).unwrap();
    assert_eq!(copy, original);
}

#[test]
fn test_large_float_field_round_trips() {
    let env = Environment::new();
    let original = Reading {
        sensor: Symbol::new("mass"),
        celsius: 1e20,
        label: None,
        samples: vec![],
        ok: false,
    };

    let handle = env.insert(&original).unwrap();
    // the slot holds a float, not an overflowed or re-kinded integer
    assert_eq!(handle.slot("celsius").unwrap(), Value::Float(1e20));

    let mut copy = Reading::default();
    env.extract(&handle, &mut copy).unwrap();
    assert_eq!(copy, original);
}

#[test]
fn test_unset_optional_round_trips_as_none() {
    let env = Environment::new();
    let handle = env
        .insert(&Reading {
            sensor: Symbol::new("thermo"),
            celsius: 0.0,
            label: None,
            samples: vec![],
            ok: false,
        })
        .unwrap();

    // the engine reports the unset slot as nil
    assert!(handle.slot("label").unwrap().is_nil());

    let mut copy = Reading {
        label: Some("stale".to_string()),
        ..Reading::default()
    };
    env.extract(&handle, &mut copy).unwrap();
    assert_eq!(copy.label, None);
}

#[test]
fn test_nested_struct_round_trip() {
    let env = Environment::new();
    let original = Parent {
        str_val: "with child".to_string(),
        child: Child { intval: Some(9) },
    };

    let handle = env.insert(&original).unwrap();

    // the child was inserted as its own instance and linked by name
    let child_ref = handle.slot("child").unwrap();
    let child_name = match child_ref {
        Value::InstanceName(n) => n,
        other => panic!("expected an instance name, got {:?}", other),
    };
    let child_handle = env.instance(&child_name).unwrap();
    assert_eq!(child_handle.slot("intval").unwrap(), Value::Integer(9));

    let mut copy = Parent::default();
    env.extract(&handle, &mut copy).unwrap();
    assert_eq!(copy, original);
}

#[test]
fn test_insert_named() {
    let env = Environment::new();
    let handle = env
        .insert_named(&Child { intval: Some(1) }, "first-child")
        .unwrap();
    assert_eq!(handle.name(), "first-child");
    assert_eq!(handle.class_name().unwrap(), "Child");
}

#[test]
fn test_extraction_is_lenient_by_name() {
    let env = Environment::new();
    // the engine class carries a slot the struct does not declare, and
    // lacks nothing the struct needs except "celsius"
    env.run(
        "(defclass Partial (is-a USER) \
         (slot sensor (type SYMBOL)) \
         (slot voltage (type FLOAT)))",
    )
    .unwrap();
    env.run("(make-instance [p] of Partial (sensor thermo) (voltage 3.3))")
        .unwrap();

    defclass! {
        pub struct Partial {
            sensor: Symbol,
            celsius: f64,
        }
    }

    let handle = env.instance("p").unwrap();
    let mut dest = Partial {
        sensor: Symbol::new("old"),
        celsius: 99.0,
    };
    env.extract(&handle, &mut dest).unwrap();
    // matched by name; unmatched field keeps its prior value
    assert_eq!(dest.sensor, Symbol::new("thermo"));
    assert_eq!(dest.celsius, 99.0);
}

#[test]
fn test_extract_map_carries_every_slot() {
    let env = Environment::new();
    let handle = env
        .insert(&Reading {
            sensor: Symbol::new("thermo"),
            celsius: 21.5,
            label: None,
            samples: vec![1],
            ok: true,
        })
        .unwrap();

    let map: HashMap<String, Value> = env.extract_map(&handle).unwrap();
    assert_eq!(map.len(), 5);
    assert_eq!(map["celsius"], Value::Float(21.5));
    assert!(map["label"].is_nil());
    assert_eq!(map["samples"], Value::Multifield(vec![Value::Integer(1)]));
}

#[test]
fn test_eval_into_typed_destinations() {
    let env = Environment::new();
    env.insert_named(&Child { intval: Some(4) }, "c").unwrap();

    let n: i64 = env.eval_into("(send [c] get-intval)").unwrap();
    assert_eq!(n, 4);

    let all: Vec<i64> = env.eval_into("(create$ 1 2 3)").unwrap();
    assert_eq!(all, vec![1, 2, 3]);

    // a class destination follows the instance name
    let child: Child = env.eval_into("(make-instance of Child (intval 7))").unwrap();
    assert_eq!(child.intval, Some(7));
}

#[test]
fn test_ordered_fact_extraction() {
    let env = Environment::new();
    let fact = env.assert_string("(measurement 1 2.0 \"three\")").unwrap();

    let raw: Vec<Value> = fact.positional().unwrap();
    assert_eq!(
        raw,
        vec![
            Value::Integer(1),
            Value::Float(2.0),
            Value::String("three".to_string()),
        ]
    );

    let text_fact = env.assert_string("(tags alpha \"beta\")").unwrap();
    let words: Vec<String> = text_fact.positional().unwrap();
    assert_eq!(words, vec!["alpha".to_string(), "beta".to_string()]);

    // a concrete element type must hold for every element
    assert!(fact.positional::<String>().is_err());
}

#[test]
fn test_unordered_fact_extraction() {
    let env = Environment::new();
    env.run("(deftemplate reading (slot sensor (type SYMBOL)) (slot celsius (type FLOAT)))")
        .unwrap();
    let fact = env
        .assert_string("(reading (sensor thermo) (celsius 20.5))")
        .unwrap();

    defclass! {
        pub struct FactReading("reading") {
            sensor: Symbol,
            celsius: f64,
        }
    }

    let mut dest = FactReading::default();
    env.extract_fact(&fact, &mut dest).unwrap();
    assert_eq!(dest.sensor, Symbol::new("thermo"));
    assert_eq!(dest.celsius, 20.5);
}

#[test]
fn test_cyclic_instance_graph_terminates() {
    let env = Environment::new();
    env.insert_named(
        &Link {
            tag: Symbol::new("a"),
            next: None,
        },
        "a",
    )
    .unwrap();
    env.insert_named(
        &Link {
            tag: Symbol::new("b"),
            next: None,
        },
        "b",
    )
    .unwrap();
    env.run("(send [a] put-next [b])").unwrap();
    env.run("(send [b] put-next [a])").unwrap();

    let handle = env.instance("a").unwrap();
    let mut dest = Link::default();
    env.extract(&handle, &mut dest).unwrap();

    assert_eq!(dest.tag, Symbol::new("a"));
    let middle = dest.next.expect("one level of expansion");
    assert_eq!(middle.tag, Symbol::new("b"));
    // the revisited instance is not expanded again
    assert_eq!(middle.next, None);
}
