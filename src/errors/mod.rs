use crate::core::ValueKind;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    ShapeMismatch { dims: Vec<usize>, expected: usize, actual: usize },
    OddNamedArgumentArity { count: usize },
    UnsupportedType { kind: ValueKind, class_name: String },
    RemoteEvaluation { function: String, message: String },
    SessionUnavailable,
    CannotStart { identifier: String },
    DuplicateField { name: String },
    InvalidArgumentName { index: usize },
    InvalidEntryCall { reason: String },
    OutputCount { function: String, requested: usize, available: usize },
    UndefinedVariable { name: String },
    LengthMismatch { names: usize, values: usize },
    Config { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { dims, expected, actual } => {
                write!(
                    f,
                    "Shape mismatch: dimensions {:?} describe {} elements, payload has {}",
                    dims, expected, actual
                )
            }
            Self::OddNamedArgumentArity { count } => {
                write!(
                    f,
                    "Named arguments must come in name/value pairs, got {} elements",
                    count
                )
            }
            Self::UnsupportedType { kind, class_name } => {
                write!(f, "No conversion rule for {} value of class '{}'", kind, class_name)
            }
            Self::RemoteEvaluation { function, message } => {
                if message.is_empty() {
                    write!(f, "Error calling function '{}'", function)
                } else {
                    write!(f, "Error calling function '{}': {}", function, message)
                }
            }
            Self::SessionUnavailable => write!(f, "No active session"),
            Self::CannotStart { identifier } => {
                write!(f, "Cannot start interpreter session '{}'", identifier)
            }
            Self::DuplicateField { name } => {
                write!(f, "Duplicate record field '{}'", name)
            }
            Self::InvalidArgumentName { index } => {
                write!(f, "Named argument slot {} is not a character row", index)
            }
            Self::InvalidEntryCall { reason } => {
                write!(f, "Invalid entry call: {}", reason)
            }
            Self::OutputCount { function, requested, available } => {
                write!(
                    f,
                    "Function '{}' produced {} outputs, {} requested",
                    function, available, requested
                )
            }
            Self::UndefinedVariable { name } => {
                write!(f, "Undefined variable: {}", name)
            }
            Self::LengthMismatch { names, values } => {
                write!(f, "Got {} names for {} values", names, values)
            }
            Self::Config { message } => write!(f, "Configuration error: {}", message),
        }
    }
}

/// Error surfaced by conversion, marshaling and session operations.
///
/// `context` records where the failure happened, innermost first
/// (a field name, a cell index, the function being called).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeError {
    pub kind: ErrorKind,
    pub context: Vec<String>,
}

impl BridgeError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn shape_mismatch(dims: &[usize], expected: usize, actual: usize) -> Self {
        Self::new(ErrorKind::ShapeMismatch {
            dims: dims.to_vec(),
            expected,
            actual,
        })
    }

    pub fn unsupported(kind: ValueKind, class_name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedType {
            kind,
            class_name: class_name.into(),
        })
    }

    pub fn remote(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteEvaluation {
            function: function.into(),
            message: message.into(),
        })
    }

    pub fn session_unavailable() -> Self {
        Self::new(ErrorKind::SessionUnavailable)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config {
            message: message.into(),
        })
    }

    /// True for failures the caller may recover from by dropping the slot.
    pub fn is_unsupported(&self) -> bool {
        matches!(self.kind, ErrorKind::UnsupportedType { .. })
    }

    /// Function name for remote evaluation failures.
    pub fn function(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::RemoteEvaluation { function, .. }
            | ErrorKind::OutputCount { function, .. } => Some(function),
            _ => None,
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for ctx in &self.context {
            write!(f, "\n  in {}", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for BridgeError {}

impl From<ErrorKind> for BridgeError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_rendered_innermost_first() {
        let err = BridgeError::shape_mismatch(&[2, 2], 4, 3)
            .with_context("field 'x'")
            .with_context("argument 1");

        let text = err.to_string();
        assert!(text.starts_with("Shape mismatch: dimensions [2, 2] describe 4 elements, payload has 3"));
        assert!(text.find("field 'x'").unwrap() < text.find("argument 1").unwrap());
    }

    #[test]
    fn test_function_is_recoverable_from_remote_error() {
        let err = BridgeError::remote("nosuch", "could not find function");
        assert_eq!(err.function(), Some("nosuch"));
        assert!(!err.is_unsupported());
        assert!(err.to_string().contains("'nosuch'"));
    }

    #[test]
    fn test_unsupported_is_flagged() {
        let err = BridgeError::unsupported(ValueKind::Opaque, "function_handle");
        assert!(err.is_unsupported());
        assert_eq!(
            err.to_string(),
            "No conversion rule for opaque value of class 'function_handle'"
        );
    }
}
