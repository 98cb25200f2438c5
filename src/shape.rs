//! Host type shapes
//!
//! A `ClassShape` is the normalized slot-schema for one host struct: an
//! ordered list of slot specs in declaration order, each with a kind,
//! cardinality, and optional referenced class. Rust has no runtime
//! reflection, so shapes are declared with the [`defclass!`] macro, which
//! also wires dynamic field access (`Fielded`) for the insert and extract
//! walkers. Cyclic type graphs are legal: nested shapes are reached through
//! function pointers and only resolved when walked.

use crate::error::ClaspError;
use crate::value::{FromValue, IntoValue, Value, ValueKind};
use crate::ClaspResult;
use std::any::Any;
use std::fmt;

/// The declared kind of a slot.
#[derive(Debug, Clone, Copy)]
pub enum SlotKind {
    Integer,
    Float,
    Text,
    Symbol,
    InstanceName,
    External,
    /// Unconstrained slot, holds any engine value
    Any,
    /// Reference to a nested class; the slot stores an instance name
    Class(&'static ClassShape),
}

impl SlotKind {
    /// The engine value kind this slot is constrained to
    pub fn value_kind(&self) -> ValueKind {
        match self {
            SlotKind::Integer => ValueKind::Integer,
            SlotKind::Float => ValueKind::Float,
            SlotKind::Text => ValueKind::String,
            SlotKind::Symbol => ValueKind::Symbol,
            SlotKind::InstanceName | SlotKind::Class(_) => ValueKind::InstanceName,
            SlotKind::External => ValueKind::ExternalAddress,
            SlotKind::Any => ValueKind::Any,
        }
    }

    /// Name of the class this slot references, if any
    pub fn referenced_class(&self) -> Option<&'static str> {
        match self {
            SlotKind::Class(shape) => Some(shape.name),
            _ => None,
        }
    }
}

impl PartialEq for SlotKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SlotKind::Class(a), SlotKind::Class(b)) => a.name == b.name,
            (SlotKind::Class(_), _) | (_, SlotKind::Class(_)) => false,
            _ => self.value_kind() == other.value_kind(),
        }
    }
}

/// One slot of a class schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotSpec {
    /// Slot name as it appears on the engine side
    pub name: &'static str,
    pub kind: SlotKind,
    /// Multifield slot (`Vec` field)
    pub multi: bool,
    /// Optional slot (`Option` field); absence round-trips as unset
    pub optional: bool,
}

/// The normalized schema of one host struct.
///
/// Slots are produced lazily through a function pointer so mutually
/// recursive shapes can reference each other.
pub struct ClassShape {
    pub name: &'static str,
    pub slots: fn() -> Vec<SlotSpec>,
    pub make: fn() -> Box<dyn Fielded>,
}

impl ClassShape {
    pub fn slot_specs(&self) -> Vec<SlotSpec> {
        (self.slots)()
    }

    /// A fresh default-initialized instance of the host struct
    pub fn instantiate(&self) -> Box<dyn Fielded> {
        (self.make)()
    }
}

impl fmt::Debug for ClassShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassShape")
            .field("name", &self.name)
            .field("slots", &self.slot_specs())
            .finish()
    }
}

/// A field value in transit between a host struct and the engine.
#[derive(Debug)]
pub enum FieldValue {
    /// A single engine value
    Unit(Value),
    /// An explicitly unset optional field
    Absent,
    /// A nested struct-valued field, inserted as its own instance
    Nested(Box<dyn Fielded>),
    /// A multifield
    List(Vec<Value>),
}

/// Dynamic, slot-name-keyed access to a host struct's fields.
///
/// Implemented by [`defclass!`]; the insert and extract walkers drive all
/// field traffic through this trait.
pub trait Fielded: Any + fmt::Debug {
    /// The shape of the concrete type behind this trait object. Named
    /// apart from [`Shaped::shape`] so both traits stay callable on
    /// concrete types.
    fn dyn_shape(&self) -> &'static ClassShape;

    /// Read the field backing `slot`. Unknown slots are an internal error;
    /// the walkers only ask for slots listed in the shape.
    fn field(&self, slot: &str) -> ClaspResult<FieldValue>;

    /// Write the field backing `slot`. Unknown slots are ignored.
    fn set_field(&mut self, slot: &str, value: FieldValue) -> ClaspResult<()>;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A type usable directly as a class: shape plus constructability.
pub trait Shaped: Fielded + Clone + Default {
    fn shape() -> &'static ClassShape;

    fn class_name() -> &'static str {
        Self::shape().name
    }
}

/// Per-field-type conversion between a Rust field and a [`FieldValue`].
///
/// Scalar impls delegate to [`FromValue`]/[`IntoValue`]; `Option` marks the
/// slot optional, `Vec` marks it multifield, and [`defclass!`] adds an impl
/// for every declared class so structs nest.
pub trait SlotValue: Sized {
    fn slot_kind() -> SlotKind;

    fn is_multi() -> bool {
        false
    }

    fn is_optional() -> bool {
        false
    }

    fn to_field(&self) -> ClaspResult<FieldValue>;

    fn from_field(value: FieldValue) -> ClaspResult<Self>;
}

fn field_kind_name(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Unit(v) => v.kind().name(),
        FieldValue::Absent => "unset slot",
        FieldValue::Nested(_) => "nested instance",
        FieldValue::List(_) => "MULTIFIELD",
    }
}

macro_rules! impl_scalar_slot_value {
    ($($t:ty => $kind:expr),* $(,)?) => {$(
        impl SlotValue for $t {
            fn slot_kind() -> SlotKind {
                $kind
            }

            fn to_field(&self) -> ClaspResult<FieldValue> {
                Ok(FieldValue::Unit(self.clone().into_value()))
            }

            fn from_field(value: FieldValue) -> ClaspResult<Self> {
                match value {
                    FieldValue::Unit(v) => <$t as FromValue>::from_value(v),
                    other => Err(ClaspError::unsupported(
                        stringify!($t),
                        field_kind_name(&other),
                    )),
                }
            }
        }
    )*};
}

impl_scalar_slot_value! {
    i8 => SlotKind::Integer,
    i16 => SlotKind::Integer,
    i32 => SlotKind::Integer,
    i64 => SlotKind::Integer,
    u8 => SlotKind::Integer,
    u16 => SlotKind::Integer,
    u32 => SlotKind::Integer,
    f32 => SlotKind::Float,
    f64 => SlotKind::Float,
    String => SlotKind::Text,
    crate::value::Symbol => SlotKind::Symbol,
    crate::value::InstanceName => SlotKind::InstanceName,
    bool => SlotKind::Symbol,
    Value => SlotKind::Any,
}

impl<T: SlotValue> SlotValue for Option<T> {
    fn slot_kind() -> SlotKind {
        T::slot_kind()
    }

    fn is_multi() -> bool {
        T::is_multi()
    }

    fn is_optional() -> bool {
        true
    }

    fn to_field(&self) -> ClaspResult<FieldValue> {
        match self {
            Some(inner) => inner.to_field(),
            None => Ok(FieldValue::Absent),
        }
    }

    fn from_field(value: FieldValue) -> ClaspResult<Self> {
        match value {
            FieldValue::Absent => Ok(None),
            other => T::from_field(other).map(Some),
        }
    }
}

impl<T: SlotValue> SlotValue for Box<T> {
    fn slot_kind() -> SlotKind {
        T::slot_kind()
    }

    fn is_multi() -> bool {
        T::is_multi()
    }

    fn is_optional() -> bool {
        T::is_optional()
    }

    fn to_field(&self) -> ClaspResult<FieldValue> {
        (**self).to_field()
    }

    fn from_field(value: FieldValue) -> ClaspResult<Self> {
        T::from_field(value).map(Box::new)
    }
}

impl<T: SlotValue> SlotValue for Vec<T> {
    fn slot_kind() -> SlotKind {
        T::slot_kind()
    }

    fn is_multi() -> bool {
        true
    }

    fn to_field(&self) -> ClaspResult<FieldValue> {
        let mut values = Vec::with_capacity(self.len());
        for element in self {
            match element.to_field()? {
                FieldValue::Unit(v) => values.push(v),
                other => {
                    return Err(ClaspError::unsupported(
                        "scalar multifield element",
                        field_kind_name(&other),
                    ))
                }
            }
        }
        Ok(FieldValue::List(values))
    }

    fn from_field(value: FieldValue) -> ClaspResult<Self> {
        let values = match value {
            FieldValue::List(values) => values,
            FieldValue::Unit(Value::Multifield(values)) => values,
            other => {
                return Err(ClaspError::unsupported(
                    "MULTIFIELD",
                    field_kind_name(&other),
                ))
            }
        };
        values
            .into_iter()
            .map(|v| T::from_field(FieldValue::Unit(v)))
            .collect()
    }
}

/// Declare a host struct as an engine class.
///
/// The struct's declaration order becomes the slot order. The class name
/// defaults to the struct identifier; an override follows the identifier in
/// parentheses, and the same form renames individual slots:
///
/// ```
/// use clasp::defclass;
///
/// defclass! {
///     pub struct Child {
///         intval: Option<i64>,
///     }
/// }
///
/// defclass! {
///     pub struct Parent("ParentClass") {
///         str_val("Str"): String,
///         child: Child,
///     }
/// }
/// ```
///
/// The macro derives `Debug`, `Clone`, `Default`, and `PartialEq`, and
/// implements [`Shaped`], [`Fielded`], [`SlotValue`] (so classes nest), and
/// the extraction destination trait.
#[macro_export]
macro_rules! defclass {
    (@slot_name $ident:ident) => {
        stringify!($ident)
    };
    (@slot_name $ident:ident ($name:literal)) => {
        $name
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $struct_name:ident $(($class_name:literal))? {
            $(
                $(#[$field_meta:meta])*
                $field:ident $(($slot:literal))? : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $struct_name {
            $(
                $(#[$field_meta])*
                pub $field: $field_ty,
            )*
        }

        impl $crate::shape::Shaped for $struct_name {
            fn shape() -> &'static $crate::shape::ClassShape {
                fn slot_specs() -> Vec<$crate::shape::SlotSpec> {
                    vec![
                        $(
                            $crate::shape::SlotSpec {
                                name: $crate::defclass!(@slot_name $field $(($slot))?),
                                kind: <$field_ty as $crate::shape::SlotValue>::slot_kind(),
                                multi: <$field_ty as $crate::shape::SlotValue>::is_multi(),
                                optional: <$field_ty as $crate::shape::SlotValue>::is_optional(),
                            },
                        )*
                    ]
                }
                fn instantiate() -> Box<dyn $crate::shape::Fielded> {
                    Box::new(<$struct_name as Default>::default())
                }
                static SHAPE: $crate::shape::ClassShape = $crate::shape::ClassShape {
                    name: $crate::defclass!(@slot_name $struct_name $(($class_name))?),
                    slots: slot_specs,
                    make: instantiate,
                };
                &SHAPE
            }
        }

        impl $crate::shape::Fielded for $struct_name {
            fn dyn_shape(&self) -> &'static $crate::shape::ClassShape {
                <Self as $crate::shape::Shaped>::shape()
            }

            fn field(&self, slot: &str) -> $crate::ClaspResult<$crate::shape::FieldValue> {
                $(
                    if slot == $crate::defclass!(@slot_name $field $(($slot))?) {
                        return <$field_ty as $crate::shape::SlotValue>::to_field(&self.$field);
                    }
                )*
                Err($crate::ClaspError::Engine(format!(
                    "class {} has no slot {}",
                    <Self as $crate::shape::Shaped>::class_name(),
                    slot
                )))
            }

            fn set_field(
                &mut self,
                slot: &str,
                value: $crate::shape::FieldValue,
            ) -> $crate::ClaspResult<()> {
                $(
                    if slot == $crate::defclass!(@slot_name $field $(($slot))?) {
                        self.$field = <$field_ty as $crate::shape::SlotValue>::from_field(value)?;
                        return Ok(());
                    }
                )*
                let _ = value;
                Ok(())
            }

            fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
                self
            }
        }

        impl $crate::shape::SlotValue for $struct_name {
            fn slot_kind() -> $crate::shape::SlotKind {
                $crate::shape::SlotKind::Class(<Self as $crate::shape::Shaped>::shape())
            }

            fn to_field(&self) -> $crate::ClaspResult<$crate::shape::FieldValue> {
                Ok($crate::shape::FieldValue::Nested(Box::new(self.clone())))
            }

            fn from_field(
                value: $crate::shape::FieldValue,
            ) -> $crate::ClaspResult<Self> {
                match value {
                    $crate::shape::FieldValue::Nested(nested) => nested
                        .into_any()
                        .downcast::<$struct_name>()
                        .map(|boxed| *boxed)
                        .map_err(|_| {
                            $crate::ClaspError::unsupported(
                                stringify!($struct_name),
                                "a different nested class",
                            )
                        }),
                    other => Err($crate::ClaspError::unsupported(
                        stringify!($struct_name),
                        match other {
                            $crate::shape::FieldValue::Unit(v) => v.kind().name(),
                            _ => "non-instance field",
                        },
                    )),
                }
            }
        }

        impl $crate::extract::Extractable for $struct_name {
            fn extract_value(
                env: &$crate::env::Environment,
                value: $crate::value::Value,
            ) -> $crate::ClaspResult<Self> {
                match value {
                    $crate::value::Value::InstanceName(name) => {
                        let mut dest = <Self as Default>::default();
                        $crate::extract::instance_into(env, &name, &mut dest)?;
                        Ok(dest)
                    }
                    other => Err($crate::ClaspError::unsupported(
                        "INSTANCE-NAME",
                        other.kind().name(),
                    )),
                }
            }
        }
    };
}
