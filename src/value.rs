//! Engine values and host conversions
//!
//! `Value` is the closed tagged union crossing the engine boundary. The
//! `IntoValue`/`FromValue` traits carry the conversion rules: integer
//! narrowing is range-checked, floats only convert to integers when the
//! fractional part is exactly zero, and `Symbol` is preserved as its own
//! kind while plain `String` destinations accept both string-likes.

use crate::error::ClaspError;
use crate::ClaspResult;
use serde::Serialize;
use std::fmt;

/// A symbol as distinct from a string on the engine side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol(s.to_string())
    }
}

/// The name of an engine instance, written `[name]` in engine syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct InstanceName(pub String);

impl InstanceName {
    pub fn new(name: impl Into<String>) -> Self {
        InstanceName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// A dynamically-typed engine value.
///
/// Multifields may hold heterogeneously typed elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Symbol(String),
    InstanceName(String),
    Multifield(Vec<Value>),
    InstanceAddress(u64),
    FactAddress(u64),
    ExternalAddress(usize),
}

/// The tag of a [`Value`], plus `Any` for unconstrained parameter and slot
/// declarations. `Value::kind` never yields `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    Integer,
    Float,
    String,
    Symbol,
    InstanceName,
    Multifield,
    InstanceAddress,
    FactAddress,
    ExternalAddress,
    Any,
}

impl ValueKind {
    /// Engine-syntax name of this kind
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Integer => "INTEGER",
            ValueKind::Float => "FLOAT",
            ValueKind::String => "STRING",
            ValueKind::Symbol => "SYMBOL",
            ValueKind::InstanceName => "INSTANCE-NAME",
            ValueKind::Multifield => "MULTIFIELD",
            ValueKind::InstanceAddress => "INSTANCE-ADDRESS",
            ValueKind::FactAddress => "FACT-ADDRESS",
            ValueKind::ExternalAddress => "EXTERNAL-ADDRESS",
            ValueKind::Any => "?VARIABLE",
        }
    }
}

impl Default for Value {
    /// The unset marker, `nil`
    fn default() -> Self {
        Value::nil()
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Symbol(_) => ValueKind::Symbol,
            Value::InstanceName(_) => ValueKind::InstanceName,
            Value::Multifield(_) => ValueKind::Multifield,
            Value::InstanceAddress(_) => ValueKind::InstanceAddress,
            Value::FactAddress(_) => ValueKind::FactAddress,
            Value::ExternalAddress(_) => ValueKind::ExternalAddress,
        }
    }

    /// The engine's `nil` symbol, used for unset slots
    pub fn nil() -> Value {
        Value::Symbol("nil".to_string())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Symbol(s) if s == "nil")
    }
}

/// Render a float so it reparses as a float (never as an integer)
fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if !v.is_finite() {
        write!(f, "{}", v)
    } else if v.fract() != 0.0 {
        // fractional values always carry a dot
        write!(f, "{}", v)
    } else if v.abs() < 1e16 {
        write!(f, "{:.1}", v)
    } else {
        // plain Display never uses exponent form, and a long digit run
        // would read back as an integer literal
        write!(f, "{:e}", v)
    }
}

impl fmt::Display for Value {
    /// Engine literal syntax, suitable for embedding in command text
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write_float(f, *v),
            Value::String(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        _ => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
            Value::Symbol(s) => write!(f, "{}", s),
            Value::InstanceName(n) => write!(f, "[{}]", n),
            Value::Multifield(values) => {
                write!(f, "(create$")?;
                for v in values {
                    write!(f, " {}", v)?;
                }
                write!(f, ")")
            }
            Value::InstanceAddress(a) => write!(f, "<Instance-{}>", a),
            Value::FactAddress(i) => write!(f, "<Fact-{}>", i),
            Value::ExternalAddress(p) => write!(f, "<Pointer-{:#x}>", p),
        }
    }
}

/// Conversion from a host value into an engine value. Infallible: every
/// implementor has an exact engine representation.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion from an engine value into a host type, applying the
/// narrowing/widening rules of the binding layer.
pub trait FromValue: Sized {
    /// The engine kind this destination declares, for parameter and slot
    /// schemas. `Any` accepts every kind.
    fn kind() -> ValueKind;

    fn from_value(value: Value) -> ClaspResult<Self>;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn kind() -> ValueKind {
        ValueKind::Any
    }

    fn from_value(value: Value) -> ClaspResult<Self> {
        Ok(value)
    }
}

macro_rules! impl_into_value_int {
    ($($t:ty)*) => {$(
        impl IntoValue for $t {
            fn into_value(self) -> Value {
                Value::Integer(self as i64)
            }
        }
    )*};
}

impl_into_value_int!(i8 i16 i32 i64 u8 u16 u32);

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self as f64)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl IntoValue for Symbol {
    fn into_value(self) -> Value {
        Value::Symbol(self.0)
    }
}

impl IntoValue for InstanceName {
    fn into_value(self) -> Value {
        Value::InstanceName(self.0)
    }
}

impl IntoValue for bool {
    /// Booleans cross the boundary as the engine's TRUE/FALSE symbols
    fn into_value(self) -> Value {
        Value::Symbol(if self { "TRUE" } else { "FALSE" }.to_string())
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Multifield(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl FromValue for i64 {
    fn kind() -> ValueKind {
        ValueKind::Integer
    }

    fn from_value(value: Value) -> ClaspResult<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            Value::Float(f) => {
                if f.fract() != 0.0 {
                    Err(ClaspError::PrecisionLoss {
                        value: f,
                        target: "i64",
                    })
                } else if f < i64::MIN as f64 || f > i64::MAX as f64 {
                    Err(ClaspError::OutOfRange {
                        value: f.to_string(),
                        target: "i64",
                    })
                } else {
                    Ok(f as i64)
                }
            }
            other => Err(ClaspError::unsupported("INTEGER", other.kind().name())),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($t:ty)*) => {$(
        impl FromValue for $t {
            fn kind() -> ValueKind {
                ValueKind::Integer
            }

            fn from_value(value: Value) -> ClaspResult<Self> {
                let wide = i64::from_value(value).map_err(|e| match e {
                    ClaspError::PrecisionLoss { value, .. } => ClaspError::PrecisionLoss {
                        value,
                        target: stringify!($t),
                    },
                    other => other,
                })?;
                <$t>::try_from(wide).map_err(|_| ClaspError::OutOfRange {
                    value: wide.to_string(),
                    target: stringify!($t),
                })
            }
        }
    )*};
}

impl_from_value_int!(i8 i16 i32 u8 u16 u32);

impl FromValue for f64 {
    fn kind() -> ValueKind {
        ValueKind::Float
    }

    fn from_value(value: Value) -> ClaspResult<Self> {
        match value {
            Value::Float(f) => Ok(f),
            // Widening an engine integer is always legal
            Value::Integer(i) => Ok(i as f64),
            other => Err(ClaspError::unsupported("FLOAT", other.kind().name())),
        }
    }
}

impl FromValue for f32 {
    fn kind() -> ValueKind {
        ValueKind::Float
    }

    fn from_value(value: Value) -> ClaspResult<Self> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for String {
    fn kind() -> ValueKind {
        ValueKind::String
    }

    /// Both string-likes satisfy a plain string destination
    fn from_value(value: Value) -> ClaspResult<Self> {
        match value {
            Value::String(s) | Value::Symbol(s) => Ok(s),
            other => Err(ClaspError::unsupported("STRING", other.kind().name())),
        }
    }
}

impl FromValue for Symbol {
    fn kind() -> ValueKind {
        ValueKind::Symbol
    }

    /// The dedicated symbol destination preserves which kind was received,
    /// so a STRING is rejected rather than silently collapsed.
    fn from_value(value: Value) -> ClaspResult<Self> {
        match value {
            Value::Symbol(s) => Ok(Symbol(s)),
            other => Err(ClaspError::unsupported("SYMBOL", other.kind().name())),
        }
    }
}

impl FromValue for InstanceName {
    fn kind() -> ValueKind {
        ValueKind::InstanceName
    }

    fn from_value(value: Value) -> ClaspResult<Self> {
        match value {
            Value::InstanceName(n) => Ok(InstanceName(n)),
            other => Err(ClaspError::unsupported("INSTANCE-NAME", other.kind().name())),
        }
    }
}

impl FromValue for bool {
    fn kind() -> ValueKind {
        ValueKind::Symbol
    }

    fn from_value(value: Value) -> ClaspResult<Self> {
        match value {
            Value::Symbol(s) if s == "TRUE" => Ok(true),
            Value::Symbol(s) if s == "FALSE" => Ok(false),
            other => Err(ClaspError::unsupported("TRUE or FALSE", other.kind().name())),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn kind() -> ValueKind {
        ValueKind::Multifield
    }

    /// Element-wise conversion: with a concrete element type every element
    /// must convert or the whole conversion fails.
    fn from_value(value: Value) -> ClaspResult<Self> {
        match value {
            Value::Multifield(values) => values.into_iter().map(T::from_value).collect(),
            other => Err(ClaspError::unsupported("MULTIFIELD", other.kind().name())),
        }
    }
}
