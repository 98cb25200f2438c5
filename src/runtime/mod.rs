//! The engine boundary
//!
//! `Runtime` is the stable contract the binding layer consumes from a rule
//! engine: textual command execution, expression evaluation, class and
//! template introspection, callback registration, and clearing. The
//! in-process [`LocalRuntime`] is the reference implementation; an FFI
//! adapter to a native engine satisfies the same trait.

pub mod local;
pub mod reader;

pub use local::LocalRuntime;

use crate::bridge::{Signature, Trampoline};
use crate::value::{Value, ValueKind};
use crate::ClaspResult;
use serde::Serialize;

/// Declared constraints of one engine-side slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotInfo {
    pub name: String,
    /// Declared value kind; `Any` when the slot is unconstrained
    pub kind: ValueKind,
    pub multi: bool,
    /// For instance-name slots, the class instances must belong to
    pub allowed_class: Option<String>,
}

/// Schema descriptor for a defined class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassInfo {
    pub name: String,
    pub slots: Vec<SlotInfo>,
}

impl ClassInfo {
    pub fn slot(&self, name: &str) -> Option<&SlotInfo> {
        self.slots.iter().find(|s| s.name == name)
    }
}

/// Schema descriptor for a defined template.
///
/// Ordered facts live under an implied singleton template holding one
/// multifield slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateInfo {
    pub name: String,
    pub slots: Vec<SlotInfo>,
    pub implied: bool,
}

impl TemplateInfo {
    pub fn slot(&self, name: &str) -> Option<&SlotInfo> {
        self.slots.iter().find(|s| s.name == name)
    }
}

/// The command/evaluation interface of a rule-engine runtime.
///
/// Implementations are single-threaded by contract; callers serialize all
/// access to one runtime instance.
pub trait Runtime {
    /// Execute construct-definition or assertion text. Engine rejections
    /// surface as `Construction` errors wrapping the engine diagnostic.
    fn run(&mut self, command: &str) -> ClaspResult<()>;

    /// Evaluate a single expression to a dynamically-typed value.
    fn eval(&mut self, expression: &str) -> ClaspResult<Value>;

    fn classes(&self) -> Vec<ClassInfo>;

    fn templates(&self) -> Vec<TemplateInfo>;

    fn class_info(&self, name: &str) -> Option<ClassInfo>;

    fn template_info(&self, name: &str) -> Option<TemplateInfo>;

    /// Register a host callable invocable from engine expressions.
    fn define(
        &mut self,
        name: &str,
        signature: Signature,
        trampoline: Trampoline,
    ) -> ClaspResult<()>;

    /// Remove every construct, instance, and fact. Registered callables
    /// survive; all outstanding handles become invalid.
    fn clear(&mut self);
}
