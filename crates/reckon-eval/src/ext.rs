//! Extension functions: named, pluggable operations with arbitrary arity.

use crate::error::{EvalError, EvalResult};
use crate::value::Store;
use reckon_ir::{FunId, OpId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An extension function.
///
/// Implementations must be pure: the result depends only on the arguments,
/// which are fetched on demand through [`Args`].
pub trait Function<S>: Send + Sync {
    /// Name used to reference the function in expressions.
    fn name(&self) -> &str;

    fn call(&self, args: &mut Args<'_, S>) -> EvalResult<S>;
}

/// Argument accessor handed to an extension function.
///
/// Arguments are evaluated lazily, through the calling context's cache, when
/// first requested. During evaluation an argument that has no result yet
/// reads as [`EvalError::NotReady`]; the evaluator then evaluates it and
/// calls the function again, discarding whatever the first call returned.
pub struct Args<'a, S> {
    ids: &'a [OpId],
    fetch: &'a mut dyn FnMut(OpId) -> EvalResult<S>,
}

impl<'a, S> Args<'a, S> {
    pub fn new(ids: &'a [OpId], fetch: &'a mut dyn FnMut(OpId) -> EvalResult<S>) -> Self {
        Self { ids, fetch }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Node ids of the arguments.
    pub fn ids(&self) -> &[OpId] {
        self.ids
    }

    /// Evaluate the argument at `position`, `None` past the last one.
    pub fn get(&mut self, position: usize) -> Option<EvalResult<S>> {
        let id = *self.ids.get(position)?;
        Some((self.fetch)(id))
    }
}

/// Built-in `avail`: the first non-null argument, or null.
///
/// Arguments after the first non-null one are not evaluated. An argument
/// error is returned immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct Avail;

impl<S: Store> Function<S> for Avail {
    fn name(&self) -> &str {
        "avail"
    }

    fn call(&self, args: &mut Args<'_, S>) -> EvalResult<S> {
        for position in 0..args.len() {
            if let Some(value) = args.get(position) {
                let value = value?;
                if value.is_non_null() {
                    return Ok(value);
                }
            }
        }
        Ok(S::null())
    }
}

/// Ordered collection of extension functions, addressed by [`FunId`].
pub struct Pool<S> {
    functions: Vec<Arc<dyn Function<S>>>,
    by_name: HashMap<String, FunId>,
}

impl<S: Store> Pool<S> {
    /// An empty pool.
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// A pool with the built-in functions.
    pub fn builtin() -> Self {
        Self::new().with(Avail)
    }

    /// Add a function. If the name is taken, the earlier function keeps it.
    pub fn with(mut self, function: impl Function<S> + 'static) -> Self {
        self.push(Arc::new(function));
        self
    }

    fn push(&mut self, function: Arc<dyn Function<S>>) {
        let id = self.functions.len();
        self.by_name
            .entry(function.name().to_string())
            .or_insert(id);
        self.functions.push(function);
    }

    /// Concatenate two pools. Functions of `other` follow those of `self`.
    pub fn merge(&self, other: &Pool<S>) -> Self {
        let mut pool = Self::new();
        for function in self.functions.iter().chain(&other.functions) {
            pool.push(Arc::clone(function));
        }
        pool
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Identifier of the function called `name`.
    pub fn id(&self, name: &str) -> Option<FunId> {
        self.by_name.get(name).copied()
    }

    /// `(name, id)` pairs, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FunId)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(id, function)| (function.name(), id))
    }

    /// Invoke function `fun`.
    pub fn call(&self, fun: FunId, args: &mut Args<'_, S>) -> EvalResult<S> {
        let function = self.functions.get(fun).ok_or(EvalError::BadFunctionId {
            fun,
            len: self.functions.len(),
        })?;
        function.call(args)
    }
}

impl<S: Store> Default for Pool<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for Pool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.functions.iter().map(|function| function.name()))
            .finish()
    }
}
