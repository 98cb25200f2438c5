//! Host callback bridging
//!
//! `define_function` registers a Rust closure under an engine name. The
//! closure's parameter types declare the argument kinds once, at
//! registration; at call time every call-site value is coerced to its
//! declared kind before the closure runs, so a coercion failure aborts the
//! call without partial invocation. Returns follow the engine convention:
//! `()` produces no result, a single value is returned directly, tuples
//! become a multifield, and a `Result` is the error-terminal form — `Err`
//! reports call failure and produces no value list.

use crate::error::ClaspError;
use crate::value::{FromValue, IntoValue, Value, ValueKind};
use crate::ClaspResult;
use serde::Serialize;
use std::rc::Rc;

/// Parameter kinds of a registered callable, inspected once at
/// registration time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signature {
    pub params: Vec<ValueKind>,
    /// Element kind of the trailing variadic parameter, if any
    pub variadic: Option<ValueKind>,
}

impl Signature {
    /// Whether `count` call-site arguments satisfy this signature
    pub fn accepts(&self, count: usize) -> bool {
        if self.variadic.is_some() {
            count >= self.params.len()
        } else {
            count == self.params.len()
        }
    }
}

/// The trailing variadic parameter of a bridged callable: zero or more
/// call-site arguments, each coerced to `T`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variadic<T>(pub Vec<T>);

impl<T> Variadic<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> std::ops::Deref for Variadic<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> IntoIterator for Variadic<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The type-erased form a runtime stores for each registered callable.
/// `Ok(None)` means the call produced no value.
pub type Trampoline = Rc<dyn Fn(Vec<Value>) -> ClaspResult<Option<Value>>>;

/// Return-value conversion for bridged callables.
pub trait IntoResults {
    fn into_results(self) -> ClaspResult<Option<Value>>;
}

impl IntoResults for () {
    fn into_results(self) -> ClaspResult<Option<Value>> {
        Ok(None)
    }
}

macro_rules! impl_scalar_into_results {
    ($($t:ty)*) => {$(
        impl IntoResults for $t {
            fn into_results(self) -> ClaspResult<Option<Value>> {
                Ok(Some(self.into_value()))
            }
        }
    )*};
}

impl_scalar_into_results! {
    i8 i16 i32 i64 u8 u16 u32 f32 f64 bool String
    crate::value::Symbol crate::value::InstanceName Value
}

impl<T: IntoValue> IntoResults for Vec<T> {
    fn into_results(self) -> ClaspResult<Option<Value>> {
        Ok(Some(self.into_value()))
    }
}

/// The error-terminal convention: a non-`Ok` return reports the call as
/// failed and produces no value list.
impl<T: IntoResults, E: std::fmt::Display> IntoResults for Result<T, E> {
    fn into_results(self) -> ClaspResult<Option<Value>> {
        match self {
            Ok(inner) => inner.into_results(),
            Err(e) => Err(ClaspError::Callback(e.to_string())),
        }
    }
}

macro_rules! impl_tuple_into_results {
    ($($t:ident),+) => {
        impl<$($t: IntoValue),+> IntoResults for ($($t,)+) {
            #[allow(non_snake_case)]
            fn into_results(self) -> ClaspResult<Option<Value>> {
                let ($($t,)+) = self;
                Ok(Some(Value::Multifield(vec![$($t.into_value()),+])))
            }
        }
    };
}

impl_tuple_into_results!(T1, T2);
impl_tuple_into_results!(T1, T2, T3);
impl_tuple_into_results!(T1, T2, T3, T4);

/// A host callable registrable under an engine function name.
///
/// Implemented for `Fn` closures of up to six parameters, each parameter
/// [`FromValue`], optionally ending in a [`Variadic`] parameter, returning
/// any [`IntoResults`] type.
pub trait Callable<Args>: 'static {
    fn signature(&self) -> Signature;

    fn invoke(&self, args: Vec<Value>) -> ClaspResult<Option<Value>>;
}

fn next_arg<T: FromValue>(
    iter: &mut std::vec::IntoIter<Value>,
    pos: &mut usize,
) -> ClaspResult<T> {
    *pos += 1;
    let value = iter
        .next()
        .ok_or_else(|| ClaspError::Callback(format!("missing argument {}", pos)))?;
    T::from_value(value).map_err(|e| ClaspError::Callback(format!("argument {}: {}", pos, e)))
}

fn check_exact(expected: usize, got: usize) -> ClaspResult<()> {
    if got != expected {
        return Err(ClaspError::Callback(format!(
            "expected {} arguments, got {}",
            expected, got
        )));
    }
    Ok(())
}

fn check_at_least(expected: usize, got: usize) -> ClaspResult<()> {
    if got < expected {
        return Err(ClaspError::Callback(format!(
            "expected at least {} arguments, got {}",
            expected, got
        )));
    }
    Ok(())
}

macro_rules! impl_callable {
    // Zero fixed parameters needs no argument cursor.
    () => {
        impl<Fun, Ret> Callable<()> for Fun
        where
            Fun: Fn() -> Ret + 'static,
            Ret: IntoResults,
        {
            fn signature(&self) -> Signature {
                Signature {
                    params: Vec::new(),
                    variadic: None,
                }
            }

            fn invoke(&self, args: Vec<Value>) -> ClaspResult<Option<Value>> {
                check_exact(0, args.len())?;
                (self)().into_results()
            }
        }

        impl<Fun, Ret, Var> Callable<(Variadic<Var>,)> for Fun
        where
            Fun: Fn(Variadic<Var>) -> Ret + 'static,
            Ret: IntoResults,
            Var: FromValue + 'static,
        {
            fn signature(&self) -> Signature {
                Signature {
                    params: Vec::new(),
                    variadic: Some(<Var as FromValue>::kind()),
                }
            }

            fn invoke(&self, args: Vec<Value>) -> ClaspResult<Option<Value>> {
                let mut rest = Vec::new();
                for (pos, value) in args.into_iter().enumerate() {
                    rest.push(Var::from_value(value).map_err(|e| {
                        ClaspError::Callback(format!("argument {}: {}", pos + 1, e))
                    })?);
                }
                (self)(Variadic(rest)).into_results()
            }
        }
    };
    ($($p:ident),+) => {
        impl<Fun, Ret, $($p),+> Callable<($($p,)+)> for Fun
        where
            Fun: Fn($($p),+) -> Ret + 'static,
            Ret: IntoResults,
            $($p: FromValue + 'static,)+
        {
            fn signature(&self) -> Signature {
                Signature {
                    params: vec![$(<$p as FromValue>::kind()),+],
                    variadic: None,
                }
            }

            #[allow(non_snake_case)]
            fn invoke(&self, args: Vec<Value>) -> ClaspResult<Option<Value>> {
                check_exact(self.signature().params.len(), args.len())?;
                let mut iter = args.into_iter();
                let mut pos = 0usize;
                // Arguments are all coerced before the callable runs; any
                // failure aborts the call here.
                $(let $p = next_arg::<$p>(&mut iter, &mut pos)?;)+
                (self)($($p),+).into_results()
            }
        }

        impl<Fun, Ret, Var, $($p),+> Callable<($($p,)+ Variadic<Var>,)> for Fun
        where
            Fun: Fn($($p,)+ Variadic<Var>) -> Ret + 'static,
            Ret: IntoResults,
            Var: FromValue + 'static,
            $($p: FromValue + 'static,)+
        {
            fn signature(&self) -> Signature {
                Signature {
                    params: vec![$(<$p as FromValue>::kind()),+],
                    variadic: Some(<Var as FromValue>::kind()),
                }
            }

            #[allow(non_snake_case)]
            fn invoke(&self, args: Vec<Value>) -> ClaspResult<Option<Value>> {
                check_at_least(self.signature().params.len(), args.len())?;
                let mut iter = args.into_iter();
                let mut pos = 0usize;
                $(let $p = next_arg::<$p>(&mut iter, &mut pos)?;)+
                let mut rest = Vec::new();
                for value in iter {
                    pos += 1;
                    rest.push(Var::from_value(value).map_err(|e| {
                        ClaspError::Callback(format!("argument {}: {}", pos, e))
                    })?);
                }
                (self)($($p,)+ Variadic(rest)).into_results()
            }
        }
    };
}

impl_callable!();
impl_callable!(A1);
impl_callable!(A1, A2);
impl_callable!(A1, A2, A3);
impl_callable!(A1, A2, A3, A4);
impl_callable!(A1, A2, A3, A4, A5);
impl_callable!(A1, A2, A3, A4, A5, A6);

/// Wrap a callable into the trampoline form a runtime stores.
pub(crate) fn trampoline<Args, C: Callable<Args>>(callable: C) -> Trampoline {
    Rc::new(move |args| callable.invoke(args))
}
