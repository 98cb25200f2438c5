//! The environment: one engine runtime and its public surface
//!
//! `Environment` owns a single runtime instance and aggregates the
//! marshalling layers: insert, extract, command execution, evaluation, and
//! callback registration. It is single-threaded by contract and
//! deliberately `!Send`; give each thread its own environment or serialize
//! access externally. Dropping the environment invalidates every
//! outstanding handle.

use crate::bridge::{trampoline, Callable};
use crate::error::ClaspError;
use crate::extract;
use crate::handle::{ClassHandle, FactHandle, InstanceHandle, RuntimeRef, TemplateHandle};
use crate::insert;
use crate::runtime::{ClassInfo, LocalRuntime, Runtime, TemplateInfo};
use crate::shape::Shaped;
use crate::value::Value;
use crate::ClaspResult;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

pub struct Environment {
    runtime: RuntimeRef,
    /// Classes already synthesized through this environment, keyed by
    /// class name; repeated inserts of the same shape skip synthesis.
    pub(crate) synthesized: RefCell<HashSet<String>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// An environment over the in-process reference runtime
    pub fn new() -> Self {
        Self::with_runtime(Rc::new(RefCell::new(LocalRuntime::new())))
    }

    /// An environment over a caller-supplied runtime (e.g. an FFI adapter)
    pub fn with_runtime(runtime: RuntimeRef) -> Self {
        Self {
            runtime,
            synthesized: RefCell::new(HashSet::new()),
        }
    }

    fn borrow_runtime(&self) -> ClaspResult<std::cell::RefMut<'_, dyn Runtime + 'static>> {
        self.runtime.try_borrow_mut().map_err(|_| {
            ClaspError::Callback("environment re-entered during evaluation".to_string())
        })
    }

    /// Execute construct-definition or assertion text.
    pub fn run(&self, command: &str) -> ClaspResult<()> {
        self.borrow_runtime()?.run(command)
    }

    /// Evaluate a single expression to a dynamically-typed value.
    pub fn eval(&self, expression: &str) -> ClaspResult<Value> {
        self.borrow_runtime()?.eval(expression)
    }

    /// Evaluate an expression and convert the result into a typed
    /// destination: a scalar, a sequence, a slot map, or a declared class
    /// struct (followed through its instance name).
    pub fn eval_into<T: extract::Extractable>(&self, expression: &str) -> ClaspResult<T> {
        let value = self.eval(expression)?;
        T::extract_value(self, value)
    }

    /// Insert a host value as an engine instance, synthesizing its class
    /// (and nested classes) on first use. The engine auto-names the
    /// instance.
    pub fn insert<T: Shaped>(&self, value: &T) -> ClaspResult<InstanceHandle> {
        insert::project(self, value, None)
    }

    /// Insert under an explicit instance name.
    pub fn insert_named<T: Shaped>(&self, value: &T, name: &str) -> ClaspResult<InstanceHandle> {
        insert::project(self, value, Some(name))
    }

    /// Walk an instance back into a host struct. Struct fields with no
    /// matching slot keep their default value; slots with no matching
    /// field are ignored.
    pub fn extract<T: Shaped>(&self, handle: &InstanceHandle, dest: &mut T) -> ClaspResult<()> {
        self.check_owned(&handle.runtime)?;
        extract::instance_into(self, &handle.name, dest)
    }

    /// Copy every slot of an instance under its engine name, unfiltered.
    pub fn extract_map(&self, handle: &InstanceHandle) -> ClaspResult<HashMap<String, Value>> {
        self.check_owned(&handle.runtime)?;
        extract::instance_map(self, &handle.name)
    }

    /// Walk an unordered fact into a host struct by template slot names.
    pub fn extract_fact<T: Shaped>(&self, handle: &FactHandle, dest: &mut T) -> ClaspResult<()> {
        self.check_owned(&handle.runtime)?;
        extract::fact_into(self, handle.index, dest)
    }

    /// Run a `(make-instance ...)` construct and hand back the instance.
    pub fn make_instance(&self, construct: &str) -> ClaspResult<InstanceHandle> {
        match self.eval(construct)? {
            Value::InstanceName(name) => Ok(self.instance_handle(name)),
            other => Err(ClaspError::Construction(format!(
                "make-instance returned {}, not an instance name",
                other.kind().name()
            ))),
        }
    }

    /// Assert a fact given as text, e.g. `(point (x 1) (y 2))` or an
    /// ordered `(foo a b c)`.
    pub fn assert_string(&self, fact: &str) -> ClaspResult<FactHandle> {
        match self.eval(&format!("(assert {})", fact))? {
            Value::FactAddress(index) => Ok(self.fact_handle(index)),
            other => Err(ClaspError::Construction(format!(
                "assert returned {}, not a fact address",
                other.kind().name()
            ))),
        }
    }

    /// Register a host callable under an engine function name. Parameter
    /// kinds come from the closure type; a trailing [`Variadic`]
    /// parameter accepts the remaining call-site arguments.
    ///
    /// [`Variadic`]: crate::bridge::Variadic
    pub fn define_function<Args>(
        &self,
        name: &str,
        callable: impl Callable<Args>,
    ) -> ClaspResult<()> {
        let signature = callable.signature();
        self.borrow_runtime()?
            .define(name, signature, trampoline(callable))
    }

    /// Handle to an existing instance by name.
    pub fn instance(&self, name: &str) -> ClaspResult<InstanceHandle> {
        match self.eval(&format!("(instance-existp [{}])", name))? {
            Value::Symbol(s) if s == "TRUE" => Ok(self.instance_handle(name.to_string())),
            _ => Err(ClaspError::stale(format!(
                "instance [{}] does not exist",
                name
            ))),
        }
    }

    /// Handle to a defined class.
    pub fn class(&self, name: &str) -> ClaspResult<ClassHandle> {
        match self.class_info(name)? {
            Some(_) => Ok(ClassHandle {
                runtime: Rc::downgrade(&self.runtime),
                name: name.to_string(),
            }),
            None => Err(ClaspError::Construction(format!(
                "class {} is not defined",
                name
            ))),
        }
    }

    /// Handle to a defined template.
    pub fn template(&self, name: &str) -> ClaspResult<TemplateHandle> {
        match self.template_info(name)? {
            Some(_) => Ok(TemplateHandle {
                runtime: Rc::downgrade(&self.runtime),
                name: name.to_string(),
            }),
            None => Err(ClaspError::Construction(format!(
                "template {} is not defined",
                name
            ))),
        }
    }

    /// Schema descriptors for every defined class.
    pub fn classes(&self) -> ClaspResult<Vec<ClassInfo>> {
        Ok(self.try_borrow()?.classes())
    }

    /// Schema descriptors for every defined template.
    pub fn templates(&self) -> ClaspResult<Vec<TemplateInfo>> {
        Ok(self.try_borrow()?.templates())
    }

    pub fn class_info(&self, name: &str) -> ClaspResult<Option<ClassInfo>> {
        Ok(self.try_borrow()?.class_info(name))
    }

    pub fn template_info(&self, name: &str) -> ClaspResult<Option<TemplateInfo>> {
        Ok(self.try_borrow()?.template_info(name))
    }

    /// Remove every construct, instance, and fact. All outstanding
    /// handles become invalid atomically; registered callables survive.
    pub fn clear(&self) -> ClaspResult<()> {
        self.borrow_runtime()?.clear();
        self.synthesized.borrow_mut().clear();
        Ok(())
    }

    fn try_borrow(&self) -> ClaspResult<std::cell::Ref<'_, dyn Runtime + 'static>> {
        self.runtime.try_borrow().map_err(|_| {
            ClaspError::Callback("environment re-entered during evaluation".to_string())
        })
    }

    pub(crate) fn instance_handle(&self, name: String) -> InstanceHandle {
        InstanceHandle {
            runtime: Rc::downgrade(&self.runtime),
            name,
        }
    }

    pub(crate) fn fact_handle(&self, index: u64) -> FactHandle {
        FactHandle {
            runtime: Rc::downgrade(&self.runtime),
            index,
        }
    }

    /// Handles carry their environment's identity; reject handles minted
    /// by a different environment.
    fn check_owned(&self, weak: &Weak<RefCell<dyn Runtime>>) -> ClaspResult<()> {
        if Weak::ptr_eq(weak, &Rc::downgrade(&self.runtime)) {
            Ok(())
        } else {
            Err(ClaspError::stale(
                "handle belongs to a different environment".to_string(),
            ))
        }
    }
}
