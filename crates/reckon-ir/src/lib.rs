//! Operation lists for reckon expressions: node catalog, structural
//! validation and dependency analysis.

pub mod analyze;
pub mod error;
pub mod ir;
pub mod validate;

pub use analyze::{invalidations, Bitmap};
pub use error::{BuildError, BuildResult};
pub use ir::*;
pub use validate::{check_parts, check_reference, validate};
