//! Validated, immutable expressions and their evaluation.

use crate::context::{Context, Substitution};
use crate::error::{EvalError, EvalResult};
use crate::ext::{Args, Pool};
use crate::ops;
use crate::results::Results;
use crate::value::Store;
use reckon_ir::{Bitmap, Node, OpId};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Immutable parts shared by an expression, its clones and its contexts.
#[derive(Debug)]
pub(crate) struct Parts<S> {
    pub(crate) ops: Vec<Node>,
    pub(crate) consts: Vec<S>,
    pub(crate) pool: Arc<Pool<S>>,
    pub(crate) invalidations: Vec<Bitmap>,
}

/// A validated expression.
///
/// Cloning is cheap: clones share the operation list, constants, function
/// pool and invalidation maps.
#[derive(Debug)]
pub struct Expression<S> {
    parts: Arc<Parts<S>>,
}

impl<S> Clone for Expression<S> {
    fn clone(&self) -> Self {
        Self {
            parts: Arc::clone(&self.parts),
        }
    }
}

impl<S: Store> Expression<S> {
    pub(crate) fn new(parts: Parts<S>) -> Self {
        Self {
            parts: Arc::new(parts),
        }
    }

    /// Create an evaluation context with substitutions held in store `U`.
    ///
    /// With `cache` off every evaluation recomputes the whole expression.
    pub fn context<U: Store>(&self, cache: bool) -> Context<S, U> {
        Context::new(Arc::clone(&self.parts), cache)
    }

    /// Create a caching context with substitutions in the expression's store.
    pub fn context_default(&self) -> Context<S> {
        self.context(true)
    }

    /// Evaluate the expression in `ctx`.
    ///
    /// Only nodes whose cached results were invalidated since the previous
    /// call are recomputed. Errors are cached and returned like values.
    /// A context created by a different expression is rejected with
    /// [`EvalError::ForeignContext`]; clones of an expression share contexts.
    pub fn evaluate<U: Store>(&self, ctx: &mut Context<S, U>) -> EvalResult<S> {
        if !Arc::ptr_eq(&self.parts, &ctx.parts) {
            return Err(EvalError::ForeignContext);
        }
        ctx.results.begin();
        let root = ctx.parts.ops.len() - 1;
        let mut eval = Evaluator {
            parts: &ctx.parts,
            substitutions: &ctx.substitutions,
            results: &mut ctx.results,
        };
        eval.run(root)
    }

    /// Every node with its current result in `ctx`, for diagnostics.
    pub fn log<'a, U: Store>(&'a self, ctx: &'a Context<S, U>) -> EvalLog<'a, S> {
        EvalLog {
            ops: &self.parts.ops,
            results: &ctx.results,
        }
    }

    pub fn ops(&self) -> &[Node] {
        &self.parts.ops
    }

    pub fn consts(&self) -> &[S] {
        &self.parts.consts
    }

    pub fn pool(&self) -> &Arc<Pool<S>> {
        &self.parts.pool
    }

    /// Id of the root node: the last one.
    pub fn root(&self) -> OpId {
        self.parts.ops.len() - 1
    }

    /// Invalidation maps, one per variable in declaration order.
    pub fn invalidations(&self) -> &[Bitmap] {
        &self.parts.invalidations
    }

    /// `(node id, name)` of each variable, in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = (OpId, &str)> {
        reckon_ir::variables(&self.parts.ops).map(|(id, _, name)| (id, &**name))
    }
}

impl<S: Store> fmt::Display for Expression<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", reckon_ir::listing(&self.parts.ops))
    }
}

struct Evaluator<'a, S, U> {
    parts: &'a Parts<S>,
    substitutions: &'a [Substitution<U>],
    results: &'a mut Results<S>,
}

/// A node on the evaluation stack and how many dependencies it has pulled.
#[derive(Debug, Clone, Copy)]
struct Frame {
    id: OpId,
    stage: usize,
}

/// What a node needs next.
enum Step<S> {
    /// Result of this dependency, then run the node again.
    Need(OpId),
    Done(EvalResult<S>),
}

impl<S: Store, U: Store> Evaluator<'_, S, U> {
    /// Evaluate `root` with an explicit work stack.
    ///
    /// Every dependency read counts as one cache lookup. A node stays on the
    /// stack until all the dependencies it asks for hold valid results.
    fn run(&mut self, root: OpId) -> EvalResult<S> {
        if let Some(cached) = self.results.lookup(root) {
            return cached;
        }
        let mut stack = vec![Frame { id: root, stage: 0 }];
        while let Some(&Frame { id, stage }) = stack.last() {
            match self.step(id, stage) {
                Step::Need(dep) => {
                    if let Some(top) = stack.last_mut() {
                        top.stage += 1;
                    }
                    if self.results.lookup(dep).is_none() {
                        stack.push(Frame { id: dep, stage: 0 });
                    }
                }
                Step::Done(outcome) => {
                    trace!(id, ok = outcome.is_ok(), "computed node");
                    self.results.store(id, outcome);
                    stack.pop();
                }
            }
        }
        self.result(root)
    }

    /// Stored result of a node evaluated during this call.
    fn result(&self, id: OpId) -> EvalResult<S> {
        self.results.last(id).cloned().unwrap_or(Err(EvalError::NotReady))
    }

    fn step(&self, id: OpId, stage: usize) -> Step<S> {
        let parts = self.parts;
        match &parts.ops[id] {
            Node::Const { slot } => Step::Done(Ok(parts.consts[*slot].clone())),
            Node::Var { slot, name } => Step::Done(self.substitute(*slot, name)),
            Node::Unary { op, arg } => match stage {
                0 => Step::Need(*arg),
                _ => Step::Done(self.result(*arg).and_then(|arg| ops::unary(*op, &arg))),
            },
            Node::Binary { op, lhs, rhs } => match stage {
                0 => Step::Need(*lhs),
                1 => match self.result(*lhs) {
                    Ok(_) => Step::Need(*rhs),
                    Err(err) => Step::Done(Err(err)),
                },
                _ => Step::Done(
                    self.result(*lhs)
                        .and_then(|lhs| ops::binary(*op, &lhs, &self.result(*rhs)?)),
                ),
            },
            Node::Ternary {
                cond,
                then,
                otherwise,
            } => {
                if stage == 0 {
                    return Step::Need(*cond);
                }
                let branch = match self.result(*cond) {
                    Ok(cond) => {
                        let view = cond.operand();
                        match ops::truth(view) {
                            Some(true) => *then,
                            Some(false) => *otherwise,
                            None => {
                                return Step::Done(Err(EvalError::BadCondition {
                                    op: id,
                                    ty: view.type_name(),
                                }))
                            }
                        }
                    }
                    Err(err) => return Step::Done(Err(err)),
                };
                match stage {
                    1 => Step::Need(branch),
                    _ => Step::Done(self.result(branch)),
                }
            }
            Node::Extension { fun, args, .. } => {
                // An argument without a valid result reads as NotReady and is
                // recorded; the call is then discarded and repeated once the
                // argument has been evaluated.
                let results = &*self.results;
                let mut pending = None;
                let mut fetch = |arg: OpId| {
                    if results.is_valid(arg) {
                        if let Some(outcome) = results.last(arg) {
                            return outcome.clone();
                        }
                    }
                    pending.get_or_insert(arg);
                    Err(EvalError::NotReady)
                };
                let outcome = parts.pool.call(*fun, &mut Args::new(args, &mut fetch));
                match pending {
                    Some(arg) => Step::Need(arg),
                    None => Step::Done(outcome),
                }
            }
        }
    }

    fn substitute(&self, slot: usize, name: &str) -> EvalResult<S> {
        let value = self.substitutions[slot]
            .value()
            .ok_or_else(|| EvalError::MissingSubstitution {
                name: name.to_string(),
            })?;
        S::convert(value).ok_or_else(|| EvalError::IncompatibleTypes {
            op: format!("${name}"),
            types: value.type_name().to_string(),
        })
    }
}

/// Display adaptor listing every node with its cached result.
pub struct EvalLog<'a, S> {
    ops: &'a [Node],
    results: &'a Results<S>,
}

impl<S: Store> fmt::Display for EvalLog<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, node) in self.ops.iter().enumerate() {
            write!(f, "\t#{id}: {node} = ")?;
            match self.results.last(id) {
                Some(Ok(value)) => write!(f, "{value}")?,
                Some(Err(err)) => write!(f, "error: {err}")?,
                None => f.write_str("<not ready>")?,
            }
            if self.results.last(id).is_some() && !self.results.is_valid(id) {
                f.write_str(" (stale)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
