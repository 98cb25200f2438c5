use std::fmt;

/// Error types for clasp operations.
///
/// Engine-side command rejections are wrapped verbatim in `Construction`;
/// clasp does not reinterpret the engine's own diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaspError {
    /// A handle was used after the underlying engine construct was
    /// retracted, unmade, or the environment was cleared or dropped.
    InvalidReference(String),

    /// An existing class definition does not accept the shape being
    /// inserted or extracted.
    SchemaMismatch {
        class: String,
        detail: String,
    },

    /// No conversion path between an engine value and the requested
    /// destination type.
    UnsupportedType {
        expected: String,
        found: String,
    },

    /// An engine integer does not fit the destination width.
    OutOfRange {
        value: String,
        target: &'static str,
    },

    /// An engine float has a non-zero fractional part and cannot be
    /// converted to an integer destination.
    PrecisionLoss {
        value: f64,
        target: &'static str,
    },

    /// The engine rejected a command or expression.
    Construction(String),

    /// A bridged callback failed: argument coercion, an error return from
    /// the host callable, or re-entrant environment use.
    Callback(String),

    /// Malformed command or expression text, with source location.
    Parse {
        message: String,
        line: usize,
        col: usize,
    },

    /// Internal invariant violation.
    Engine(String),
}

impl ClaspError {
    /// Conversion failure between engine and host kinds
    pub fn unsupported(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnsupportedType {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Schema incompatibility against an already-defined class
    pub fn mismatch(class: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            class: class.into(),
            detail: detail.into(),
        }
    }

    /// Stale or foreign handle
    pub fn stale(detail: impl Into<String>) -> Self {
        Self::InvalidReference(detail.into())
    }
}

impl fmt::Display for ClaspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaspError::InvalidReference(msg) => write!(f, "Invalid reference: {}", msg),
            ClaspError::SchemaMismatch { class, detail } => {
                write!(f, "Schema mismatch for class '{}': {}", class, detail)
            }
            ClaspError::UnsupportedType { expected, found } => {
                write!(f, "Unsupported type: expected {}, found {}", expected, found)
            }
            ClaspError::OutOfRange { value, target } => {
                write!(f, "Out of range: {} does not fit {}", value, target)
            }
            ClaspError::PrecisionLoss { value, target } => {
                write!(f, "Precision loss: {} has a fractional part, cannot convert to {}", value, target)
            }
            ClaspError::Construction(msg) => write!(f, "Construction error: {}", msg),
            ClaspError::Callback(msg) => write!(f, "Callback error: {}", msg),
            ClaspError::Parse { message, line, col } => {
                write!(f, "Parse error: {} at {}:{}", message, line, col)
            }
            ClaspError::Engine(msg) => write!(f, "Engine error: {}", msg),
        }
    }
}

impl std::error::Error for ClaspError {}

impl From<std::fmt::Error> for ClaspError {
    fn from(err: std::fmt::Error) -> Self {
        ClaspError::Engine(format!("Format error: {}", err))
    }
}
