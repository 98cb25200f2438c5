//! Projection of host values into engine instances
//!
//! Rendering is textual: a shape walks its slots, nested class fields
//! insert their own instance first and contribute the resulting name, and
//! the assembled `(make-instance ...)` command runs as a single engine
//! evaluation.

use crate::env::Environment;
use crate::error::ClaspError;
use crate::handle::InstanceHandle;
use crate::shape::{FieldValue, Fielded};
use crate::synthesis;
use crate::value::Value;
use crate::ClaspResult;
use std::fmt::Write;

pub(crate) fn project(
    env: &Environment,
    value: &dyn Fielded,
    name: Option<&str>,
) -> ClaspResult<InstanceHandle> {
    synthesis::ensure_class(env, value.dyn_shape())?;
    let command = render(env, value, name)?;
    match env.eval(&command)? {
        Value::InstanceName(instance) => Ok(env.instance_handle(instance)),
        other => Err(ClaspError::Engine(format!(
            "make-instance returned {}, not an instance name",
            other.kind().name()
        ))),
    }
}

fn render(env: &Environment, value: &dyn Fielded, name: Option<&str>) -> ClaspResult<String> {
    let shape = value.dyn_shape();
    let mut command = String::new();
    write!(command, "(make-instance ")?;
    if let Some(given) = name {
        write!(command, "[{}] ", given)?;
    }
    write!(command, "of {}", shape.name)?;
    for spec in shape.slot_specs() {
        match value.field(spec.name)? {
            FieldValue::Absent => continue,
            FieldValue::Unit(v) => write!(command, " ({} {})", spec.name, v)?,
            FieldValue::List(items) => {
                write!(command, " ({}", spec.name)?;
                for item in items {
                    write!(command, " {}", item)?;
                }
                write!(command, ")")?;
            }
            FieldValue::Nested(child) => {
                // the child instance exists before its parent names it
                let handle = project(env, &*child, None)?;
                write!(command, " ({} [{}])", spec.name, handle.name())?;
            }
        }
    }
    write!(command, ")")?;
    Ok(command)
}
