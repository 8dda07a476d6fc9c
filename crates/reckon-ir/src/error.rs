//! Errors raised while assembling or validating an operation list.

use thiserror::Error;

/// Builder and structural validation error.
///
/// Variants that describe a problem inside an operation list carry the
/// rendered listing in `ops`, so a diagnostic is self-contained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("cannot build an empty expression")]
    Empty,

    #[error("{op} refers to an unknown argument #{reference} ({len} operations available)")]
    RefToUnknown {
        op: String,
        reference: usize,
        len: usize,
    },

    #[error("operation #{id} is dangling; ops:\n{ops}")]
    Dangling { id: usize, ops: String },

    #[error("operation #{id}: {op} refers to an element #{reference} up the expression tree; ops:\n{ops}")]
    BadArgument {
        id: usize,
        op: String,
        reference: usize,
        ops: String,
    },

    #[error("operation #{id}: {op} refers to substitution {slot} ({len} available); ops:\n{ops}")]
    BadSubstitution {
        id: usize,
        op: String,
        slot: usize,
        len: usize,
        ops: String,
    },

    #[error("extension function @{name} is not registered")]
    BadFunction { name: String },

    #[error("expression exceeds the limit of {limit} operations")]
    TooManyOps { limit: usize },
}

pub type BuildResult<T> = Result<T, BuildError>;
