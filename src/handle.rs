//! Weak handles to engine-side constructs
//!
//! A handle is a {runtime identity, native key} pair with no ownership and
//! no cached state. Validity is a dynamic property: every accessor
//! revalidates against the live runtime at the point of use and fails with
//! `InvalidReference` when the construct is gone or the environment has
//! been dropped.

use crate::error::ClaspError;
use crate::runtime::{ClassInfo, Runtime, TemplateInfo};
use crate::value::{FromValue, IntoValue, Value};
use crate::ClaspResult;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Shared ownership of a runtime, as an environment holds it.
pub type RuntimeRef = Rc<RefCell<dyn Runtime>>;

pub(crate) type WeakRuntime = Weak<RefCell<dyn Runtime>>;

fn upgrade(runtime: &WeakRuntime) -> ClaspResult<RuntimeRef> {
    runtime
        .upgrade()
        .ok_or_else(|| ClaspError::stale("environment has been deleted".to_string()))
}

fn eval_in(runtime: &WeakRuntime, expression: &str) -> ClaspResult<Value> {
    let rt = upgrade(runtime)?;
    let mut guard = rt.try_borrow_mut().map_err(|_| {
        ClaspError::Callback("environment re-entered during evaluation".to_string())
    })?;
    guard.eval(expression)
}

/// Handle to a live instance, keyed by instance name.
#[derive(Clone)]
pub struct InstanceHandle {
    pub(crate) runtime: WeakRuntime,
    pub(crate) name: String,
}

impl InstanceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The class this instance belongs to
    pub fn class_name(&self) -> ClaspResult<String> {
        match eval_in(&self.runtime, &format!("(class [{}])", self.name))? {
            Value::Symbol(s) => Ok(s),
            other => Err(ClaspError::Engine(format!(
                "class query returned {}",
                other.kind().name()
            ))),
        }
    }

    /// Read one slot. Unset slots read as the `nil` symbol.
    pub fn slot(&self, slot: &str) -> ClaspResult<Value> {
        eval_in(&self.runtime, &format!("(send [{}] get-{})", self.name, slot))
    }

    /// Write one slot.
    pub fn set_slot(&self, slot: &str, value: impl IntoValue) -> ClaspResult<()> {
        eval_in(
            &self.runtime,
            &format!("(send [{}] put-{} {})", self.name, slot, value.into_value()),
        )?;
        Ok(())
    }

    /// Whether the instance still exists
    pub fn exists(&self) -> bool {
        matches!(
            eval_in(&self.runtime, &format!("(instance-existp [{}])", self.name)),
            Ok(Value::Symbol(s)) if s == "TRUE"
        )
    }

    /// Delete the instance; the handle becomes stale.
    pub fn unmake(&self) -> ClaspResult<()> {
        eval_in(&self.runtime, &format!("(unmake-instance [{}])", self.name))?;
        Ok(())
    }
}

impl std::fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InstanceHandle([{}])", self.name)
    }
}

/// Handle to an asserted fact, keyed by fact index.
#[derive(Clone)]
pub struct FactHandle {
    pub(crate) runtime: WeakRuntime,
    pub(crate) index: u64,
}

impl FactHandle {
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Name of the template this fact belongs to
    pub fn template_name(&self) -> ClaspResult<String> {
        match eval_in(&self.runtime, &format!("(fact-relation {})", self.index))? {
            Value::Symbol(s) => Ok(s),
            other => Err(ClaspError::Engine(format!(
                "fact-relation returned {}",
                other.kind().name()
            ))),
        }
    }

    /// Slot names declared by the fact's template
    pub fn slot_names(&self) -> ClaspResult<Vec<String>> {
        match eval_in(&self.runtime, &format!("(fact-slot-names {})", self.index))? {
            Value::Multifield(values) => Ok(values
                .into_iter()
                .map(|v| match v {
                    Value::Symbol(s) | Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect()),
            other => Err(ClaspError::Engine(format!(
                "fact-slot-names returned {}",
                other.kind().name()
            ))),
        }
    }

    /// Read one named slot of an unordered fact
    pub fn slot(&self, slot: &str) -> ClaspResult<Value> {
        eval_in(
            &self.runtime,
            &format!("(fact-slot-value {} {})", self.index, slot),
        )
    }

    /// Values of an ordered fact, in assertion order, each converted to
    /// `T`. Fails on unordered facts, which have no positional reading.
    pub fn positional<T: FromValue>(&self) -> ClaspResult<Vec<T>> {
        match self.slot(crate::runtime::local::IMPLIED_SLOT)? {
            Value::Multifield(values) => values.into_iter().map(T::from_value).collect(),
            other => Err(ClaspError::unsupported("MULTIFIELD", other.kind().name())),
        }
    }

    pub fn exists(&self) -> bool {
        matches!(
            eval_in(&self.runtime, &format!("(fact-existp {})", self.index)),
            Ok(Value::Symbol(s)) if s == "TRUE"
        )
    }

    /// Retract the fact; asserted facts are immutable, so modification is
    /// retract-and-reassert. The handle becomes stale.
    pub fn retract(&self) -> ClaspResult<()> {
        eval_in(&self.runtime, &format!("(retract {})", self.index))?;
        Ok(())
    }
}

impl std::fmt::Debug for FactHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FactHandle(f-{})", self.index)
    }
}

/// Handle to a defined class, keyed by name.
#[derive(Clone)]
pub struct ClassHandle {
    pub(crate) runtime: WeakRuntime,
    pub(crate) name: String,
}

impl ClassHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current schema of the class
    pub fn info(&self) -> ClaspResult<ClassInfo> {
        let rt = upgrade(&self.runtime)?;
        let guard = rt.try_borrow().map_err(|_| {
            ClaspError::Callback("environment re-entered during evaluation".to_string())
        })?;
        guard
            .class_info(&self.name)
            .ok_or_else(|| ClaspError::stale(format!("class {} is not defined", self.name)))
    }
}

impl std::fmt::Debug for ClassHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClassHandle({})", self.name)
    }
}

/// Handle to a defined template, keyed by name.
#[derive(Clone)]
pub struct TemplateHandle {
    pub(crate) runtime: WeakRuntime,
    pub(crate) name: String,
}

impl TemplateHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current schema of the template
    pub fn info(&self) -> ClaspResult<TemplateInfo> {
        let rt = upgrade(&self.runtime)?;
        let guard = rt.try_borrow().map_err(|_| {
            ClaspError::Callback("environment re-entered during evaluation".to_string())
        })?;
        guard
            .template_info(&self.name)
            .ok_or_else(|| ClaspError::stale(format!("template {} is not defined", self.name)))
    }
}

impl std::fmt::Debug for TemplateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TemplateHandle({})", self.name)
    }
}
