//! In-process reference runtime
//!
//! `LocalRuntime` implements the [`Runtime`](super::Runtime) contract with
//! an in-memory construct store: classes, templates, instances, and facts,
//! plus the expression builtins the binding layer emits (`make-instance`,
//! `assert`, `send`, the `fact-*` accessors, `create$`, and registered
//! callables). It deliberately contains no pattern matcher and no agenda;
//! inference stays the external engine's job.

use super::reader::{parse_form, parse_forms, Form};
use super::{ClassInfo, Runtime, SlotInfo, TemplateInfo};
use crate::bridge::{Signature, Trampoline};
use crate::error::ClaspError;
use crate::value::{Value, ValueKind};
use crate::ClaspResult;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct InstanceData {
    class: String,
    slots: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
struct FactData {
    template: String,
    slots: HashMap<String, Value>,
}

/// The slot name of the implied template backing ordered facts.
pub const IMPLIED_SLOT: &str = "implied";

#[derive(Default)]
pub struct LocalRuntime {
    classes: HashMap<String, ClassInfo>,
    templates: HashMap<String, TemplateInfo>,
    instances: HashMap<String, InstanceData>,
    facts: HashMap<u64, FactData>,
    functions: HashMap<String, (Signature, Trampoline)>,
    next_fact: u64,
    next_gen: u64,
}

impl LocalRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn eval_form(&mut self, form: &Form) -> ClaspResult<Value> {
        match form {
            Form::Int(i) => Ok(Value::Integer(*i)),
            Form::Float(f) => Ok(Value::Float(*f)),
            Form::Str(s) => Ok(Value::String(s.clone())),
            Form::Sym(s) => Ok(Value::Symbol(s.clone())),
            Form::Name(n) => Ok(Value::InstanceName(n.clone())),
            Form::List(items) => self.eval_call(items),
        }
    }

    fn eval_call(&mut self, items: &[Form]) -> ClaspResult<Value> {
        let head = items
            .first()
            .and_then(Form::as_symbol)
            .ok_or_else(|| {
                ClaspError::Construction("expression head must be a symbol".to_string())
            })?
            .to_string();
        let args = &items[1..];

        match head.as_str() {
            "create$" => {
                let mut values = Vec::new();
                for arg in args {
                    match self.eval_form(arg)? {
                        Value::Multifield(inner) => values.extend(inner),
                        v => values.push(v),
                    }
                }
                Ok(Value::Multifield(values))
            }
            "make-instance" => self.make_instance(args),
            "assert" => self.assert_fact(args),
            "retract" => {
                let index = self.fact_index_arg(args, 0)?;
                if self.facts.remove(&index).is_none() {
                    return Err(ClaspError::stale(format!("fact f-{} does not exist", index)));
                }
                Ok(Value::Symbol("TRUE".to_string()))
            }
            "unmake-instance" => {
                let name = self.instance_name_arg(args, 0)?;
                if self.instances.remove(&name).is_none() {
                    return Err(ClaspError::stale(format!(
                        "instance [{}] does not exist",
                        name
                    )));
                }
                Ok(Value::Symbol("TRUE".to_string()))
            }
            "send" => self.send(args),
            "class" => {
                let name = self.instance_name_arg(args, 0)?;
                let data = self.instance(&name)?;
                Ok(Value::Symbol(data.class.clone()))
            }
            "instance-existp" => {
                let name = self.instance_name_arg(args, 0)?;
                Ok(bool_symbol(self.instances.contains_key(&name)))
            }
            "fact-existp" => {
                let index = self.fact_index_arg(args, 0)?;
                Ok(bool_symbol(self.facts.contains_key(&index)))
            }
            "fact-relation" => {
                let index = self.fact_index_arg(args, 0)?;
                let fact = self.fact(index)?;
                Ok(Value::Symbol(fact.template.clone()))
            }
            "fact-slot-names" => {
                let index = self.fact_index_arg(args, 0)?;
                let fact = self.fact(index)?;
                let template = self.templates.get(&fact.template).ok_or_else(|| {
                    ClaspError::Engine(format!("template {} missing for fact", fact.template))
                })?;
                Ok(Value::Multifield(
                    template
                        .slots
                        .iter()
                        .map(|s| Value::Symbol(s.name.clone()))
                        .collect(),
                ))
            }
            "fact-slot-value" => {
                let index = self.fact_index_arg(args, 0)?;
                let slot = symbol_arg(args, 1)?;
                self.fact_slot_value(index, &slot)
            }
            _ => self.call_function(&head, args),
        }
    }

    fn make_instance(&mut self, args: &[Form]) -> ClaspResult<Value> {
        let mut rest = args;
        let given_name = match rest.first() {
            Some(Form::Name(n)) => {
                rest = &rest[1..];
                Some(n.clone())
            }
            _ => None,
        };

        match rest.first().and_then(Form::as_symbol) {
            Some("of") => rest = &rest[1..],
            _ => {
                return Err(ClaspError::Construction(
                    "make-instance expects 'of <class>'".to_string(),
                ))
            }
        }

        let class_name = rest
            .first()
            .and_then(Form::as_symbol)
            .ok_or_else(|| ClaspError::Construction("make-instance expects a class name".to_string()))?
            .to_string();
        rest = &rest[1..];

        let info = self
            .classes
            .get(&class_name)
            .cloned()
            .ok_or_else(|| ClaspError::Construction(format!("class {} is undefined", class_name)))?;

        let mut slots = HashMap::new();
        for override_form in rest {
            let (slot_name, values) = self.slot_override(override_form)?;
            let slot = info.slot(&slot_name).ok_or_else(|| {
                ClaspError::Construction(format!(
                    "class {} has no slot {}",
                    class_name, slot_name
                ))
            })?;
            if let Some(value) = store_slot_value(slot, values, &class_name)? {
                slots.insert(slot_name, value);
            }
        }

        let name = match given_name {
            Some(n) => n,
            None => {
                self.next_gen += 1;
                format!("gen{}", self.next_gen)
            }
        };
        self.instances.insert(
            name.clone(),
            InstanceData {
                class: class_name,
                slots,
            },
        );
        Ok(Value::InstanceName(name))
    }

    /// A `(slot value ...)` override inside make-instance or assert
    fn slot_override(&mut self, form: &Form) -> ClaspResult<(String, Vec<Value>)> {
        let items = match form {
            Form::List(items) => items,
            other => {
                return Err(ClaspError::Construction(format!(
                    "expected a (slot value) list, found {}",
                    other.describe()
                )))
            }
        };
        let slot_name = items
            .first()
            .and_then(Form::as_symbol)
            .ok_or_else(|| ClaspError::Construction("slot override needs a slot name".to_string()))?
            .to_string();
        let mut values = Vec::new();
        for value_form in &items[1..] {
            values.push(self.eval_form(value_form)?);
        }
        Ok((slot_name, values))
    }

    fn assert_fact(&mut self, args: &[Form]) -> ClaspResult<Value> {
        let items = match args.first() {
            Some(Form::List(items)) if !items.is_empty() => items,
            _ => {
                return Err(ClaspError::Construction(
                    "assert expects a (template ...) form".to_string(),
                ))
            }
        };
        let template_name = items
            .first()
            .and_then(Form::as_symbol)
            .ok_or_else(|| {
                ClaspError::Construction("fact head must be a template name".to_string())
            })?
            .to_string();
        let body = &items[1..];

        let existing = self.templates.get(&template_name).cloned();
        let unordered = matches!(&existing, Some(t) if !t.implied);

        let mut slots = HashMap::new();
        if let (true, Some(info)) = (unordered, existing) {
            for override_form in body {
                let (slot_name, values) = self.slot_override(override_form)?;
                let slot = info.slot(&slot_name).ok_or_else(|| {
                    ClaspError::Construction(format!(
                        "template {} has no slot {}",
                        template_name, slot_name
                    ))
                })?;
                if let Some(value) = store_slot_value(slot, values, &template_name)? {
                    slots.insert(slot_name, value);
                }
            }
        } else {
            let mut values = Vec::new();
            for value_form in body {
                values.push(self.eval_form(value_form)?);
            }
            self.templates
                .entry(template_name.clone())
                .or_insert_with(|| implied_template(&template_name));
            slots.insert(IMPLIED_SLOT.to_string(), Value::Multifield(values));
        }

        self.next_fact += 1;
        let index = self.next_fact;
        self.facts.insert(
            index,
            FactData {
                template: template_name,
                slots,
            },
        );
        Ok(Value::FactAddress(index))
    }

    fn send(&mut self, args: &[Form]) -> ClaspResult<Value> {
        let name = self.instance_name_arg(args, 0)?;
        let message = symbol_arg(args, 1)?;

        if let Some(slot_name) = message.strip_prefix("get-") {
            let data = self.instance(&name)?;
            let class = self.classes.get(&data.class).ok_or_else(|| {
                ClaspError::Engine(format!("class {} missing for instance", data.class))
            })?;
            if class.slot(slot_name).is_none() {
                return Err(ClaspError::Construction(format!(
                    "class {} has no slot {}",
                    data.class, slot_name
                )));
            }
            return Ok(data.slots.get(slot_name).cloned().unwrap_or_else(Value::nil));
        }

        if let Some(slot_name) = message.strip_prefix("put-") {
            let mut values = Vec::new();
            for value_form in &args[2..] {
                values.push(self.eval_form(value_form)?);
            }
            let data = self.instance(&name)?;
            let class_name = data.class.clone();
            let class = self.classes.get(&class_name).ok_or_else(|| {
                ClaspError::Engine(format!("class {} missing for instance", class_name))
            })?;
            let slot = class.slot(slot_name).ok_or_else(|| {
                ClaspError::Construction(format!(
                    "class {} has no slot {}",
                    class_name, slot_name
                ))
            })?;
            let stored = store_slot_value(slot, values, &class_name)?;
            let data = self
                .instances
                .get_mut(&name)
                .ok_or_else(|| ClaspError::stale(format!("instance [{}] does not exist", name)))?;
            return Ok(match stored {
                Some(value) => {
                    data.slots.insert(slot_name.to_string(), value.clone());
                    value
                }
                None => {
                    data.slots.remove(slot_name);
                    Value::nil()
                }
            });
        }

        Err(ClaspError::Construction(format!(
            "unknown message {}",
            message
        )))
    }

    fn fact_slot_value(&self, index: u64, slot: &str) -> ClaspResult<Value> {
        let fact = self.fact(index)?;
        let template = self.templates.get(&fact.template).ok_or_else(|| {
            ClaspError::Engine(format!("template {} missing for fact", fact.template))
        })?;
        if template.slot(slot).is_none() {
            return Err(ClaspError::Construction(format!(
                "template {} has no slot {}",
                fact.template, slot
            )));
        }
        Ok(fact.slots.get(slot).cloned().unwrap_or_else(Value::nil))
    }

    fn call_function(&mut self, name: &str, args: &[Form]) -> ClaspResult<Value> {
        let (signature, trampoline) = match self.functions.get(name) {
            Some((s, t)) => (s.clone(), t.clone()),
            None => {
                return Err(ClaspError::Construction(format!(
                    "undefined function or construct: {}",
                    name
                )))
            }
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_form(arg)?);
        }
        if !signature.accepts(values.len()) {
            return Err(ClaspError::Construction(format!(
                "function {} called with {} arguments",
                name,
                values.len()
            )));
        }
        match trampoline(values)? {
            Some(value) => Ok(value),
            None => Ok(Value::nil()),
        }
    }

    fn define_class(&mut self, items: &[Form]) -> ClaspResult<()> {
        let name = items
            .get(1)
            .and_then(Form::as_symbol)
            .ok_or_else(|| ClaspError::Construction("defclass expects a class name".to_string()))?
            .to_string();

        let mut slots = Vec::new();
        for form in &items[2..] {
            let parts = match form {
                Form::List(parts) if !parts.is_empty() => parts,
                _ => continue,
            };
            let keyword = parts[0].as_symbol().unwrap_or_default();
            match keyword {
                "is-a" | "role" | "pattern-match" => continue,
                "slot" | "multislot" => {
                    slots.push(parse_slot_definition(parts, keyword == "multislot")?);
                }
                other => {
                    return Err(ClaspError::Construction(format!(
                        "unsupported defclass element: {}",
                        other
                    )))
                }
            }
        }

        self.classes.insert(name.clone(), ClassInfo { name, slots });
        Ok(())
    }

    fn define_template(&mut self, items: &[Form]) -> ClaspResult<()> {
        let name = items
            .get(1)
            .and_then(Form::as_symbol)
            .ok_or_else(|| {
                ClaspError::Construction("deftemplate expects a template name".to_string())
            })?
            .to_string();

        let mut slots = Vec::new();
        for form in &items[2..] {
            let parts = match form {
                Form::List(parts) if !parts.is_empty() => parts,
                _ => continue,
            };
            let keyword = parts[0].as_symbol().unwrap_or_default();
            match keyword {
                "slot" | "multislot" => {
                    slots.push(parse_slot_definition(parts, keyword == "multislot")?);
                }
                other => {
                    return Err(ClaspError::Construction(format!(
                        "unsupported deftemplate element: {}",
                        other
                    )))
                }
            }
        }

        self.templates.insert(
            name.clone(),
            TemplateInfo {
                name,
                slots,
                implied: false,
            },
        );
        Ok(())
    }

    fn instance(&self, name: &str) -> ClaspResult<&InstanceData> {
        self.instances
            .get(name)
            .ok_or_else(|| ClaspError::stale(format!("instance [{}] does not exist", name)))
    }

    fn fact(&self, index: u64) -> ClaspResult<&FactData> {
        self.facts
            .get(&index)
            .ok_or_else(|| ClaspError::stale(format!("fact f-{} does not exist", index)))
    }

    fn instance_name_arg(&mut self, args: &[Form], position: usize) -> ClaspResult<String> {
        let form = args.get(position).ok_or_else(|| {
            ClaspError::Construction("missing instance-name argument".to_string())
        })?;
        match self.eval_form(form)? {
            Value::InstanceName(n) | Value::Symbol(n) => Ok(n),
            other => Err(ClaspError::Construction(format!(
                "expected an instance name, got {}",
                other.kind().name()
            ))),
        }
    }

    fn fact_index_arg(&mut self, args: &[Form], position: usize) -> ClaspResult<u64> {
        let form = args
            .get(position)
            .ok_or_else(|| ClaspError::Construction("missing fact-index argument".to_string()))?;
        match self.eval_form(form)? {
            Value::Integer(i) if i >= 0 => Ok(i as u64),
            Value::FactAddress(i) => Ok(i),
            other => Err(ClaspError::Construction(format!(
                "expected a fact index, got {}",
                other.kind().name()
            ))),
        }
    }
}

fn bool_symbol(value: bool) -> Value {
    Value::Symbol(if value { "TRUE" } else { "FALSE" }.to_string())
}

fn symbol_arg(args: &[Form], position: usize) -> ClaspResult<String> {
    args.get(position)
        .and_then(Form::as_symbol)
        .map(str::to_string)
        .ok_or_else(|| ClaspError::Construction("expected a symbol argument".to_string()))
}

fn implied_template(name: &str) -> TemplateInfo {
    TemplateInfo {
        name: name.to_string(),
        slots: vec![SlotInfo {
            name: IMPLIED_SLOT.to_string(),
            kind: ValueKind::Any,
            multi: true,
            allowed_class: None,
        }],
        implied: true,
    }
}

/// Parse `(slot name (type KIND) (allowed-classes C))`
fn parse_slot_definition(parts: &[Form], multi: bool) -> ClaspResult<SlotInfo> {
    let name = parts
        .get(1)
        .and_then(Form::as_symbol)
        .ok_or_else(|| ClaspError::Construction("slot definition needs a name".to_string()))?
        .to_string();

    let mut kind = ValueKind::Any;
    let mut allowed_class = None;
    for constraint in &parts[2..] {
        let items = match constraint {
            Form::List(items) if !items.is_empty() => items,
            _ => continue,
        };
        match items[0].as_symbol().unwrap_or_default() {
            "type" => {
                let type_name = items
                    .get(1)
                    .and_then(Form::as_symbol)
                    .ok_or_else(|| {
                        ClaspError::Construction("type constraint needs a kind".to_string())
                    })?;
                kind = parse_type_name(type_name)?;
            }
            "allowed-classes" => {
                allowed_class = items.get(1).and_then(Form::as_symbol).map(str::to_string);
            }
            _ => continue,
        }
    }

    Ok(SlotInfo {
        name,
        kind,
        multi,
        allowed_class,
    })
}

fn parse_type_name(name: &str) -> ClaspResult<ValueKind> {
    match name {
        "INTEGER" => Ok(ValueKind::Integer),
        "FLOAT" => Ok(ValueKind::Float),
        "STRING" => Ok(ValueKind::String),
        "SYMBOL" => Ok(ValueKind::Symbol),
        "INSTANCE-NAME" => Ok(ValueKind::InstanceName),
        "FACT-ADDRESS" => Ok(ValueKind::FactAddress),
        "EXTERNAL-ADDRESS" => Ok(ValueKind::ExternalAddress),
        "?VARIABLE" => Ok(ValueKind::Any),
        other => Err(ClaspError::Construction(format!(
            "unknown slot type: {}",
            other
        ))),
    }
}

/// Validate values against a slot's constraints and produce the stored
/// form: multislots always store a multifield, single slots one value.
/// `None` means the slot stays unset.
fn store_slot_value(
    slot: &SlotInfo,
    mut values: Vec<Value>,
    owner: &str,
) -> ClaspResult<Option<Value>> {
    if slot.multi {
        let mut elements = Vec::new();
        for value in values {
            match value {
                Value::Multifield(inner) => {
                    for element in inner {
                        elements.push(check_kind(slot, element, owner)?);
                    }
                }
                other => elements.push(check_kind(slot, other, owner)?),
            }
        }
        return Ok(Some(Value::Multifield(elements)));
    }

    match values.len() {
        0 => Ok(None),
        1 => {
            let value = values.remove(0);
            if value.is_nil() {
                return Ok(None);
            }
            Ok(Some(check_kind(slot, value, owner)?))
        }
        n => Err(ClaspError::Construction(format!(
            "slot {} of {} takes a single value, got {}",
            slot.name, owner, n
        ))),
    }
}

fn check_kind(slot: &SlotInfo, value: Value, owner: &str) -> ClaspResult<Value> {
    match slot.kind {
        ValueKind::Any => Ok(value),
        // Engine numeric coercion: an integer satisfies a float slot
        ValueKind::Float => match value {
            Value::Float(_) => Ok(value),
            Value::Integer(i) => Ok(Value::Float(i as f64)),
            other => Err(kind_error(slot, &other, owner)),
        },
        expected => {
            if value.kind() == expected {
                Ok(value)
            } else {
                Err(kind_error(slot, &value, owner))
            }
        }
    }
}

fn kind_error(slot: &SlotInfo, value: &Value, owner: &str) -> ClaspError {
    ClaspError::Construction(format!(
        "slot {} of {} expects {}, got {}",
        slot.name,
        owner,
        slot.kind.name(),
        value.kind().name()
    ))
}

impl Runtime for LocalRuntime {
    fn run(&mut self, command: &str) -> ClaspResult<()> {
        for form in parse_forms(command)? {
            match &form {
                Form::List(items) => match items.first().and_then(Form::as_symbol) {
                    Some("defclass") => self.define_class(items)?,
                    Some("deftemplate") => self.define_template(items)?,
                    _ => {
                        self.eval_form(&form)?;
                    }
                },
                other => {
                    self.eval_form(other)?;
                }
            }
        }
        Ok(())
    }

    fn eval(&mut self, expression: &str) -> ClaspResult<Value> {
        let form = parse_form(expression)?;
        self.eval_form(&form)
    }

    fn classes(&self) -> Vec<ClassInfo> {
        let mut all: Vec<ClassInfo> = self.classes.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    fn templates(&self) -> Vec<TemplateInfo> {
        let mut all: Vec<TemplateInfo> = self.templates.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    fn class_info(&self, name: &str) -> Option<ClassInfo> {
        self.classes.get(name).cloned()
    }

    fn template_info(&self, name: &str) -> Option<TemplateInfo> {
        self.templates.get(name).cloned()
    }

    fn define(
        &mut self,
        name: &str,
        signature: Signature,
        trampoline: Trampoline,
    ) -> ClaspResult<()> {
        self.functions
            .insert(name.to_string(), (signature, trampoline));
        Ok(())
    }

    fn clear(&mut self) {
        self.classes.clear();
        self.templates.clear();
        self.instances.clear();
        self.facts.clear();
        self.next_fact = 0;
        self.next_gen = 0;
    }
}
