use clasp::{defclass, Environment, FromValue, IntoValue, Value};
use proptest::prelude::*;

defclass! {
    pub struct Sample {
        count: i64,
        ratio: f64,
        note: String,
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_integer_narrowing_matches_try_from(n in any::<i64>()) {
        let narrowed = u8::from_value(Value::Integer(n));
        match u8::try_from(n) {
            Ok(expected) => prop_assert_eq!(narrowed.unwrap(), expected),
            Err(_) => prop_assert!(narrowed.is_err()),
        }
    }

    #[test]
    fn prop_whole_floats_convert_to_integers(n in -1_000_000i64..1_000_000) {
        let value = Value::Float(n as f64);
        prop_assert_eq!(i64::from_value(value).unwrap(), n);
    }

    #[test]
    fn prop_fractional_floats_never_convert(n in -1000i64..1000, frac in 0.001f64..0.999) {
        let value = Value::Float(n as f64 + frac);
        prop_assert!(i64::from_value(value).is_err());
    }

    #[test]
    fn prop_integer_literals_reparse(n in any::<i64>()) {
        let env = Environment::new();
        let text = Value::Integer(n).to_string();
        prop_assert_eq!(env.eval(&text).unwrap(), Value::Integer(n));
    }

    #[test]
    fn prop_float_literals_reparse_as_floats(x in -1.0e6f64..1.0e6) {
        let env = Environment::new();
        let text = Value::Float(x).to_string();
        prop_assert_eq!(env.eval(&text).unwrap(), Value::Float(x));
    }

    #[test]
    fn prop_string_literals_reparse(s in "[ -~]{0,40}") {
        let env = Environment::new();
        let text = Value::String(s.clone()).to_string();
        prop_assert_eq!(env.eval(&text).unwrap(), Value::String(s));
    }

    #[test]
    fn prop_insert_extract_round_trip(
        count in any::<i64>(),
        ratio in -1.0e6f64..1.0e6,
        note in "[ -~]{0,20}",
    ) {
        let env = Environment::new();
        let original = Sample { count, ratio, note };
        let handle = env.insert(&original).unwrap();

        let mut copy = Sample::default();
        env.extract(&handle, &mut copy).unwrap();
        prop_assert_eq!(copy, original);
    }

    #[test]
    fn prop_bridged_identity_preserves_integers(n in any::<i64>()) {
        let env = Environment::new();
        env.define_function("identity", |x: i64| x).unwrap();
        let result = env.eval(&format!("(identity {})", Value::Integer(n))).unwrap();
        prop_assert_eq!(result, Value::Integer(n));
    }
}

// multifield elements convert element-wise, so one bad element fails the lot
proptest! {
    #[test]
    fn prop_vector_conversion_is_all_or_nothing(values in prop::collection::vec(any::<i64>(), 0..8)) {
        let multifield: Value = values.clone().into_value();
        prop_assert_eq!(Vec::<i64>::from_value(multifield).unwrap(), values);
    }
}
