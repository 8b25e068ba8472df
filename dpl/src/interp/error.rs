//! Runtime errors for the interpreter

use super::value::{Kind, Value};
use thiserror::Error;

/// Runtime error during evaluation.
///
/// `Return` is not a failure: it carries the operand of a `return` statement up to
/// the nearest function call, which turns it back into a normal result.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("operator {op} is not defined for type {kind}")]
    OperatorNotDefined { op: String, kind: Kind },

    #[error("cannot convert {from} to {to}")]
    Conversion { from: Kind, to: &'static str },

    #[error("index out of range")]
    IndexOutOfRange,

    #[error("type {0} does not support indexing")]
    NoIndexSupport(Kind),

    #[error("type {0} does not support element assignment")]
    NoIndexMutationSupport(Kind),

    #[error("type {0} cannot be used as an index")]
    InvalidIndex(Kind),

    #[error("type {0} does not support iteration")]
    NoIterSupport(Kind),

    #[error("type {0} does not support iteration over pairs")]
    NoIterSupport2(Kind),

    #[error("type {0} has no length")]
    NoLenSupport(Kind),

    #[error("type {0} does not support appending elements")]
    NoAppendSupport(Kind),

    #[error("type {0} is not callable")]
    NoCallSupport(Kind),

    #[error("division by zero")]
    DivisionByZero,

    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("variable {0} already exists")]
    VariableAlreadyExists(String),

    #[error("identifier expected")]
    IdentifierExpected,

    #[error("too few recipients")]
    TooFewRecipients,

    #[error("too many recipients")]
    TooManyRecipients,

    /// Control flow: early return from a function (with value)
    #[error("`return` used outside a function context")]
    Return(Value),

    #[error("`return` used outside a function context")]
    ReturnOutsideFunction,

    #[error("{0}: at least one argument is required")]
    BuiltinArity(&'static str),

    #[error("maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),

    #[error("output error: {0}")]
    Output(String),
}

impl RuntimeError {
    pub fn operator_not_defined(op: impl ToString, kind: Kind) -> Self {
        RuntimeError::OperatorNotDefined {
            op: op.to_string(),
            kind,
        }
    }

    pub fn conversion(from: Kind, to: &'static str) -> Self {
        RuntimeError::Conversion { from, to }
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::Output(err.to_string())
    }
}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;
