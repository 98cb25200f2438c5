//! # Clasp
//!
//! **Typed bindings for a CLIPS-style rule engine**
//!
//! Clasp marshals host values into engine instances and facts and back,
//! synthesizing engine classes from declared type shapes, bridging host
//! functions into engine expressions, and guarding every engine reference
//! behind revalidating handles.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clasp::{defclass, ClaspResult, Environment};
//!
//! defclass! {
//!     /// A point in the plane
//!     pub struct Point {
//!         x: i64,
//!         y: i64,
//!         label: Option<String>,
//!     }
//! }
//!
//! fn main() -> ClaspResult<()> {
//!     let env = Environment::new();
//!
//!     // First insert defines the point class on the engine
//!     let handle = env.insert(&Point {
//!         x: 3,
//!         y: 4,
//!         label: Some("origin-adjacent".to_string()),
//!     })?;
//!
//!     // Expressions evaluate straight into host types
//!     env.define_function("hypot", |x: f64, y: f64| (x * x + y * y).sqrt())?;
//!     let length: f64 = env.eval_into(&format!(
//!         "(hypot (send [{}] get-x) (send [{}] get-y))",
//!         handle.name(),
//!         handle.name()
//!     ))?;
//!     assert_eq!(length, 5.0);
//!
//!     // And instances walk back into structs
//!     let mut copy = Point::default();
//!     env.extract(&handle, &mut copy)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Shapes
//! The [`defclass!`] macro declares a struct together with its engine
//! class schema. Field types choose slot kinds: integers, floats, text,
//! symbols, `Option` for optional slots, `Vec` for multislots, and other
//! declared classes for nested instance references.
//!
//! ### Handles
//! [`InstanceHandle`] and [`FactHandle`] hold weak references and
//! revalidate on every use; operations after retraction, unmaking, a
//! clear, or environment drop fail with
//! [`ClaspError::InvalidReference`] instead of touching stale state.
//!
//! ### The function bridge
//! [`Environment::define_function`] registers plain closures. Arguments
//! coerce per the closure's parameter types before the closure runs, a
//! trailing [`Variadic`] parameter collects the remaining arguments, and
//! `Result` returns become engine-visible errors.

pub mod bridge;
pub mod env;
pub mod error;
pub mod extract;
pub mod handle;
pub mod insert;
pub mod runtime;
pub mod serializers;
pub mod shape;
pub mod synthesis;
pub mod value;

pub use bridge::{Callable, Signature, Variadic};
pub use env::Environment;
pub use error::ClaspError;
pub use extract::Extractable;
pub use handle::{ClassHandle, FactHandle, InstanceHandle, RuntimeRef, TemplateHandle};
pub use runtime::{ClassInfo, LocalRuntime, Runtime, SlotInfo, TemplateInfo};
pub use shape::{ClassShape, FieldValue, Fielded, Shaped, SlotKind, SlotSpec, SlotValue};
pub use value::{FromValue, InstanceName, IntoValue, Symbol, Value, ValueKind};

/// Result type for clasp operations
pub type ClaspResult<T> = Result<T, ClaspError>;

#[cfg(test)]
mod tests;
