//! Extraction of engine values into host destinations
//!
//! Extraction is lenient by name: struct fields with no matching slot
//! keep their default value, and slots with no matching field are
//! ignored. Nested instance references expand recursively into nested
//! structs; an instance revisited along the walk is left at its default
//! rather than expanded again.

use crate::env::Environment;
use crate::error::ClaspError;
use crate::shape::{FieldValue, Fielded, SlotKind, SlotSpec};
use crate::value::{FromValue, InstanceName, Symbol, Value};
use crate::ClaspResult;
use std::collections::{HashMap, HashSet};

/// Conversion from an engine evaluation result into a host destination.
///
/// Implemented for scalars, `Vec`, slot maps, and every class declared
/// with [`defclass!`](crate::defclass); class destinations follow an
/// instance name back through the engine.
pub trait Extractable: Sized {
    fn extract_value(env: &Environment, value: Value) -> ClaspResult<Self>;
}

macro_rules! impl_extractable_scalar {
    ($($t:ty)*) => {
        $(
            impl Extractable for $t {
                fn extract_value(_env: &Environment, value: Value) -> ClaspResult<Self> {
                    <$t as FromValue>::from_value(value)
                }
            }
        )*
    };
}

impl_extractable_scalar!(i8 i16 i32 i64 u8 u16 u32 f32 f64 bool String Symbol InstanceName Value);

impl<T: FromValue> Extractable for Vec<T> {
    fn extract_value(_env: &Environment, value: Value) -> ClaspResult<Self> {
        Vec::<T>::from_value(value)
    }
}

impl Extractable for HashMap<String, Value> {
    fn extract_value(env: &Environment, value: Value) -> ClaspResult<Self> {
        match value {
            Value::InstanceName(name) => instance_map(env, &name),
            Value::FactAddress(index) => fact_map(env, index),
            other => Err(ClaspError::unsupported(
                "an instance name or fact address",
                other.kind().name(),
            )),
        }
    }
}

/// Fill a shaped destination from an instance, recursing through nested
/// class slots.
pub fn instance_into(env: &Environment, name: &str, dest: &mut dyn Fielded) -> ClaspResult<()> {
    let mut visited = HashSet::new();
    fill_instance(env, name, dest, &mut visited)
}

fn fill_instance(
    env: &Environment,
    name: &str,
    dest: &mut dyn Fielded,
    visited: &mut HashSet<String>,
) -> ClaspResult<()> {
    visited.insert(name.to_string());
    let class_name = match env.eval(&format!("(class [{}])", name))? {
        Value::Symbol(class_name) => class_name,
        other => {
            return Err(ClaspError::Engine(format!(
                "class of [{}] evaluated to {}",
                name,
                other.kind().name()
            )))
        }
    };
    let info = env
        .class_info(&class_name)?
        .ok_or_else(|| ClaspError::Engine(format!("class {} is not defined", class_name)))?;

    for spec in dest.dyn_shape().slot_specs() {
        if info.slot(spec.name).is_none() {
            continue;
        }
        let value = env.eval(&format!("(send [{}] get-{})", name, spec.name))?;
        apply_slot(env, dest, &spec, value, visited)?;
    }
    Ok(())
}

fn apply_slot(
    env: &Environment,
    dest: &mut dyn Fielded,
    spec: &SlotSpec,
    value: Value,
    visited: &mut HashSet<String>,
) -> ClaspResult<()> {
    if let SlotKind::Class(child_shape) = spec.kind {
        let child_name = match value {
            Value::InstanceName(child_name) => child_name,
            ref nil if nil.is_nil() => {
                if spec.optional {
                    dest.set_field(spec.name, FieldValue::Absent)?;
                }
                return Ok(());
            }
            other => {
                return Err(ClaspError::mismatch(
                    child_shape.name,
                    format!(
                        "slot {} holds {}, expected an instance name",
                        spec.name,
                        other.kind().name()
                    ),
                ))
            }
        };
        if visited.contains(&child_name) {
            return Ok(());
        }
        let mut child = child_shape.instantiate();
        fill_instance(env, &child_name, child.as_mut(), visited)?;
        return dest.set_field(spec.name, FieldValue::Nested(child));
    }

    // an unset slot reads back as the symbol nil
    if value.is_nil() {
        if spec.optional {
            return dest.set_field(spec.name, FieldValue::Absent);
        }
        if !matches!(spec.kind, SlotKind::Any) {
            return Ok(());
        }
    }

    if spec.multi {
        let items = match value {
            Value::Multifield(items) => items,
            single => vec![single],
        };
        dest.set_field(spec.name, FieldValue::List(items))
    } else {
        dest.set_field(spec.name, FieldValue::Unit(value))
    }
}

/// Every slot of an instance, by name, without conversion.
pub fn instance_map(env: &Environment, name: &str) -> ClaspResult<HashMap<String, Value>> {
    let class_name = match env.eval(&format!("(class [{}])", name))? {
        Value::Symbol(class_name) => class_name,
        other => {
            return Err(ClaspError::Engine(format!(
                "class of [{}] evaluated to {}",
                name,
                other.kind().name()
            )))
        }
    };
    let info = env
        .class_info(&class_name)?
        .ok_or_else(|| ClaspError::Engine(format!("class {} is not defined", class_name)))?;

    let mut map = HashMap::new();
    for slot in &info.slots {
        let value = env.eval(&format!("(send [{}] get-{})", name, slot.name))?;
        map.insert(slot.name.clone(), value);
    }
    Ok(map)
}

/// Fill a shaped destination from an unordered fact by slot name.
pub(crate) fn fact_into(env: &Environment, index: u64, dest: &mut dyn Fielded) -> ClaspResult<()> {
    let template_name = match env.eval(&format!("(fact-relation {})", index))? {
        Value::Symbol(template_name) => template_name,
        other => {
            return Err(ClaspError::Engine(format!(
                "fact-relation evaluated to {}",
                other.kind().name()
            )))
        }
    };
    let info = env.template_info(&template_name)?.ok_or_else(|| {
        ClaspError::Engine(format!("template {} is not defined", template_name))
    })?;

    let mut visited = HashSet::new();
    for spec in dest.dyn_shape().slot_specs() {
        if info.slot(spec.name).is_none() {
            continue;
        }
        let value = env.eval(&format!("(fact-slot-value {} {})", index, spec.name))?;
        apply_slot(env, dest, &spec, value, &mut visited)?;
    }
    Ok(())
}

/// Every slot of a fact, by name, without conversion.
pub fn fact_map(env: &Environment, index: u64) -> ClaspResult<HashMap<String, Value>> {
    let names = match env.eval(&format!("(fact-slot-names {})", index))? {
        Value::Multifield(names) => names,
        other => {
            return Err(ClaspError::Engine(format!(
                "fact-slot-names evaluated to {}",
                other.kind().name()
            )))
        }
    };

    let mut map = HashMap::new();
    for name in names {
        let slot = match name {
            Value::Symbol(slot) => slot,
            other => {
                return Err(ClaspError::Engine(format!(
                    "fact slot name evaluated to {}",
                    other.kind().name()
                )))
            }
        };
        let value = env.eval(&format!("(fact-slot-value {} {})", index, slot))?;
        map.insert(slot, value);
    }
    Ok(map)
}
