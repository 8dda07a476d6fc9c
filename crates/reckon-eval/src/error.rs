//! Evaluation and context errors.

use reckon_ir::OpId;
use thiserror::Error;

/// Evaluation error.
///
/// Errors are cached like successful results, so they are cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("operation {op} cannot be applied to ({types})")]
    IncompatibleTypes { op: String, types: String },

    #[error("accessor for variable ${name} is missing")]
    MissingSubstitution { name: String },

    #[error("extension function #{fun} does not exist ({len} functions in the pool)")]
    BadFunctionId { fun: usize, len: usize },

    #[error("condition #{op} of type {ty} cannot be converted to bool")]
    BadCondition { op: OpId, ty: &'static str },

    #[error("division by zero in {op}")]
    DivisionByZero { op: &'static str },

    #[error("integer overflow in {op}")]
    Overflow { op: &'static str },

    /// An extension function read an argument that has not been evaluated
    /// yet. The evaluator evaluates it and repeats the call.
    #[error("expression result is not ready")]
    NotReady,

    #[error("context was created for a different expression")]
    ForeignContext,
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Error looking up a substitution in a context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("variable ${name} not found in the expression context")]
    UnknownVariable { name: String },

    #[error("substitution index {index} is out of range ({len} variables)")]
    BadIndex { index: usize, len: usize },
}
