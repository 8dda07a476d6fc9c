//! Building, evaluating and caching reckon expressions.
//!
//! ```
//! use reckon_eval::{BinOp, Builder, Single};
//!
//! let mut b: Builder<Single<f64>> = Builder::new();
//! let a = b.var("a")?;
//! let half = b.constant(0.5)?;
//! b.binary(BinOp::Mul, a, half)?;
//! let expr = b.build()?;
//!
//! let mut ctx = expr.context_default();
//! ctx.assign_by_name("a", 3.0)?;
//! assert_eq!(expr.evaluate(&mut ctx)?, Single(Some(1.5)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod expression;
pub mod ext;
pub mod ops;
pub mod results;
pub mod value;

pub use builder::{Builder, BuilderConfig};
pub use context::{Context, Substitution};
pub use error::{ContextError, EvalError, EvalResult};
pub use expression::{EvalLog, Expression};
pub use ext::{Args, Avail, Function, Pool};
pub use results::CacheStats;
pub use value::{Operand, Scalar, ScalarType, Single, Store, Value};

pub use reckon_ir::{BinOp, BuildError, BuildResult, Node, OpId, UnaryOp};
