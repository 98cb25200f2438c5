use crate::error::ClaspError;
use crate::value::Value;
use crate::ClaspResult;
use std::collections::HashMap;

/// Convert a JSON value to an engine value.
///
/// Mapping:
/// - null becomes the symbol `nil`
/// - booleans become the symbols `TRUE` / `FALSE`
/// - numbers become integers when they carry no fraction, floats otherwise
/// - strings stay strings
/// - arrays become multifields
///
/// Objects have no engine literal and are rejected; insert a shaped value
/// instead.
pub fn from_json(json: &serde_json::Value) -> ClaspResult<Value> {
    match json {
        serde_json::Value::Null => Ok(Value::nil()),
        serde_json::Value::Bool(b) => Ok(Value::Symbol(
            if *b { "TRUE" } else { "FALSE" }.to_string(),
        )),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(ClaspError::unsupported("INTEGER or FLOAT", n.to_string()))
            }
        }
        serde_json::Value::String(s) => Ok(Value::String(s.clone())),
        serde_json::Value::Array(items) => {
            let values = items.iter().map(from_json).collect::<ClaspResult<_>>()?;
            Ok(Value::Multifield(values))
        }
        serde_json::Value::Object(_) => Err(ClaspError::unsupported(
            "a JSON scalar or array",
            "a JSON object",
        )),
    }
}

/// Parse JSON text straight to an engine value.
pub fn parse_json(json: &str) -> ClaspResult<Value> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| ClaspError::Engine(format!("JSON parse error: {}", e)))?;
    from_json(&parsed)
}

/// Convert an engine value to JSON.
///
/// The symbols `TRUE` / `FALSE` become booleans and `nil` becomes null;
/// other symbols become strings. Instance names keep their bracketed
/// rendering so they stay distinguishable from plain strings. Fact and
/// address values flatten to their numeric identity.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Symbol(s) => match s.as_str() {
            "TRUE" => serde_json::Value::Bool(true),
            "FALSE" => serde_json::Value::Bool(false),
            "nil" => serde_json::Value::Null,
            other => serde_json::Value::String(other.to_string()),
        },
        Value::InstanceName(n) => serde_json::Value::String(format!("[{}]", n)),
        Value::Multifield(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect())
        }
        Value::InstanceAddress(a) => serde_json::Value::from(*a),
        Value::FactAddress(i) => serde_json::Value::from(*i),
        Value::ExternalAddress(a) => serde_json::Value::from(*a as u64),
    }
}

/// Render an extracted slot map as a JSON object.
pub fn map_to_json(map: &HashMap<String, Value>) -> serde_json::Value {
    let object = map
        .iter()
        .map(|(name, value)| (name.clone(), to_json(value)))
        .collect();
    serde_json::Value::Object(object)
}
