//! Class synthesis from declared host shapes
//!
//! The first insert of a shape defines a matching `defclass` on the
//! engine. Nested class references are synthesized first, depth-first;
//! members of a reference cycle are deferred and resolve by name once the
//! whole cycle is defined. If a class with the same name already exists
//! it must be slot-compatible with the shape, otherwise the insert is
//! rejected with a schema mismatch.

use crate::env::Environment;
use crate::error::ClaspError;
use crate::runtime::ClassInfo;
use crate::shape::{ClassShape, SlotKind, SlotSpec};
use crate::value::ValueKind;
use crate::ClaspResult;
use std::collections::HashSet;
use std::fmt::Write;

pub(crate) fn ensure_class(env: &Environment, shape: &'static ClassShape) -> ClaspResult<()> {
    let mut pending = HashSet::new();
    ensure_inner(env, shape, &mut pending)
}

fn ensure_inner(
    env: &Environment,
    shape: &'static ClassShape,
    pending: &mut HashSet<&'static str>,
) -> ClaspResult<()> {
    if env.synthesized.borrow().contains(shape.name) || pending.contains(shape.name) {
        return Ok(());
    }
    if let Some(info) = env.class_info(shape.name)? {
        check_compatible(shape, &info)?;
        env.synthesized.borrow_mut().insert(shape.name.to_string());
        return Ok(());
    }

    pending.insert(shape.name);
    for spec in shape.slot_specs() {
        if let SlotKind::Class(child) = spec.kind {
            ensure_inner(env, child, pending)?;
        }
    }
    env.run(&render_defclass(shape)?)?;
    pending.remove(shape.name);
    env.synthesized.borrow_mut().insert(shape.name.to_string());
    Ok(())
}

/// An existing class accepts a shape when every declared slot is present
/// with the same kind, arity, and class constraint. Extra engine slots
/// are tolerated; extraction ignores them. An unconstrained engine slot
/// accepts every kind.
fn check_compatible(shape: &ClassShape, info: &ClassInfo) -> ClaspResult<()> {
    for spec in shape.slot_specs() {
        let slot = info.slot(spec.name).ok_or_else(|| {
            ClaspError::mismatch(
                shape.name,
                format!("existing class has no slot named {}", spec.name),
            )
        })?;
        if slot.multi != spec.multi {
            return Err(ClaspError::mismatch(
                shape.name,
                format!(
                    "slot {} arity differs from the existing class",
                    spec.name
                ),
            ));
        }
        if slot.kind == ValueKind::Any {
            continue;
        }
        if slot.kind != spec.kind.value_kind() {
            return Err(ClaspError::mismatch(
                shape.name,
                format!(
                    "slot {} is declared {} but the existing class holds {}",
                    spec.name,
                    spec.kind.value_kind().name(),
                    slot.kind.name()
                ),
            ));
        }
        if slot.allowed_class.as_deref() != spec.kind.referenced_class() {
            return Err(ClaspError::mismatch(
                shape.name,
                format!(
                    "slot {} references a different class than the existing definition",
                    spec.name
                ),
            ));
        }
    }
    Ok(())
}

fn render_defclass(shape: &ClassShape) -> ClaspResult<String> {
    let mut text = String::new();
    write!(text, "(defclass {} (is-a USER)", shape.name)?;
    for spec in shape.slot_specs() {
        write!(text, " {}", render_slot(&spec)?)?;
    }
    write!(text, ")")?;
    Ok(text)
}

fn render_slot(spec: &SlotSpec) -> ClaspResult<String> {
    let mut text = String::new();
    let keyword = if spec.multi { "multislot" } else { "slot" };
    write!(text, "({} {}", keyword, spec.name)?;
    match spec.kind {
        SlotKind::Integer => write!(text, " (type INTEGER)")?,
        SlotKind::Float => write!(text, " (type FLOAT)")?,
        SlotKind::Text => write!(text, " (type STRING)")?,
        SlotKind::Symbol => write!(text, " (type SYMBOL)")?,
        SlotKind::InstanceName => write!(text, " (type INSTANCE-NAME)")?,
        SlotKind::External => write!(text, " (type EXTERNAL-ADDRESS)")?,
        SlotKind::Any => {}
        SlotKind::Class(child) => {
            write!(text, " (type INSTANCE-NAME) (allowed-classes {})", child.name)?
        }
    }
    write!(text, ")")?;
    Ok(text)
}
