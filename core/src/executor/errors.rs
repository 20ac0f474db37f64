//! Runtime error types and stable error codes

use thiserror::Error;

use super::types::ast::Span;
use crate::normalizer::ParseError;

/* ===================== Error Codes ===================== */

pub const UNDEFINED_VARIABLE: &str = "UNDEFINED_VARIABLE";
pub const INDEX_OUT_OF_RANGE: &str = "INDEX_OUT_OF_RANGE";
pub const TYPE_ERROR: &str = "TYPE_ERROR";
pub const DIVISION_BY_ZERO: &str = "DIVISION_BY_ZERO";
pub const OVERFLOW: &str = "OVERFLOW";
pub const UNSUPPORTED: &str = "UNSUPPORTED";
pub const INVALID_TARGET: &str = "INVALID_TARGET";
pub const REDECLARED: &str = "REDECLARED";
pub const STRAY_CONTROL: &str = "STRAY_CONTROL";
pub const NESTING_TOO_DEEP: &str = "NESTING_TOO_DEEP";

/* ===================== Runtime Errors ===================== */

/// What went wrong while executing a statement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("'{name}' is not defined")]
    Undefined { name: String },

    #[error("'{name}' is already declared in this scope")]
    Redeclared { name: String },

    #[error("index {index} is out of range for '{name}' (length {len})")]
    IndexOutOfRange { name: String, index: i64, len: usize },

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("left side of assignment is not a variable or element")]
    InvalidTarget,

    #[error("'{0}' outside of a loop")]
    StrayControl(&'static str),

    #[error("program nested too deeply (more than {0} levels)")]
    NestingTooDeep(usize),
}

impl ErrorKind {
    /// Stable code for this kind of error
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Undefined { .. } => UNDEFINED_VARIABLE,
            ErrorKind::Redeclared { .. } => REDECLARED,
            ErrorKind::IndexOutOfRange { .. } => INDEX_OUT_OF_RANGE,
            ErrorKind::Type(_) => TYPE_ERROR,
            ErrorKind::DivisionByZero => DIVISION_BY_ZERO,
            ErrorKind::Overflow => OVERFLOW,
            ErrorKind::Unsupported(_) => UNSUPPORTED,
            ErrorKind::InvalidTarget => INVALID_TARGET,
            ErrorKind::StrayControl(_) => STRAY_CONTROL,
            ErrorKind::NestingTooDeep(_) => NESTING_TOO_DEEP,
        }
    }

    /// Attach the source location where the error surfaced
    pub fn at(self, span: Span) -> RuntimeError {
        RuntimeError { kind: self, span }
    }
}

/// A runtime fault with the location of the failing construct
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {}: {}", .span.start_line + 1, .kind)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub span: Span,
}

impl RuntimeError {
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/* ===================== Engine Errors ===================== */

/// Anything that turns a run into a failure
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("{0}")]
    Normalize(#[from] ParseError),

    #[error("invalid variable '{name}': {reason}")]
    Binding { name: String, reason: String },

    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}
