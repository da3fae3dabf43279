//! Error types for keymap compilation, serialization and state handling.
//!
//! `keyrx_core` is `no_std`, so these types carry a hand-written
//! [`core::fmt::Display`] impl rather than deriving one through `thiserror`
//! (which the `std`-based crates in this workspace use instead).

use alloc::string::String;

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// Everything that can go wrong compiling, serializing or running a keymap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The canonical-format reader could not parse the input.
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },
    /// A name referenced in an expression or statement was never declared.
    UndefinedName(String),
    /// An expression resolved to a value of the wrong kind for its context.
    BadType { expected: &'static str, context: String },
    /// An array index was supplied for a field that is not an array.
    NotAnArray(String),
    /// A statement referenced a field name this compiler does not know.
    UnknownField(String),
    /// A legacy field was recognised but is no longer meaningful; logged and
    /// dropped rather than treated as fatal.
    UnsupportedField(String),
    /// Two records of the same identity collided under a merge mode that
    /// forbids silent resolution.
    DuplicateName(String),
    /// The indicator-map table (fixed size 32) is full.
    OutOfSpace { what: &'static str, capacity: usize },
    /// A requested text output format is not implemented (only `TEXT_V1` is).
    UnsupportedFormat(String),
    /// A single statement file produced more than ten per-statement errors
    /// and compilation of that file was aborted.
    TooManyErrors { file: String, count: usize },
    /// Reserved for allocator exhaustion. `alloc` aborts the process on OOM
    /// in this crate the same way it always has, so this variant is never
    /// actually constructed; it exists only for API-shape parity.
    AllocFailure,
}

impl core::fmt::Display for CoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CoreError::ParseError {
                line,
                column,
                message,
            } => write!(f, "line {}, column {}: {}", line, column, message),
            CoreError::UndefinedName(name) => write!(f, "undefined name: '{}'", name),
            CoreError::BadType { expected, context } => {
                write!(f, "expected a {} value in {}", expected, context)
            }
            CoreError::NotAnArray(field) => {
                write!(f, "field '{}' is not an array", field)
            }
            CoreError::UnknownField(field) => write!(f, "unknown field: '{}'", field),
            CoreError::UnsupportedField(field) => {
                write!(f, "unsupported legacy field: '{}'", field)
            }
            CoreError::DuplicateName(name) => {
                write!(f, "duplicate name under a merge mode that forbids it: '{}'", name)
            }
            CoreError::OutOfSpace { what, capacity } => {
                write!(f, "{} table is full (capacity {})", what, capacity)
            }
            CoreError::UnsupportedFormat(fmt_name) => {
                write!(f, "unsupported keymap text format: '{}'", fmt_name)
            }
            CoreError::TooManyErrors { file, count } => {
                write!(f, "aborted compiling '{}' after {} errors", file, count)
            }
            CoreError::AllocFailure => write!(f, "allocation failure"),
        }
    }
}

impl core::error::Error for CoreError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_renders_context() {
        let err = CoreError::UndefinedName("Foo".to_string());
        assert_eq!(err.to_string(), "undefined name: 'Foo'");
    }

    #[test]
    fn display_parse_error_includes_position() {
        let err = CoreError::ParseError {
            line: 3,
            column: 7,
            message: "unexpected token".to_string(),
        };
        assert_eq!(err.to_string(), "line 3, column 7: unexpected token");
    }
}
