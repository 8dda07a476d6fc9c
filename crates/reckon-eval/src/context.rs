//! Evaluation contexts: variable substitutions plus a results cache.
//!
//! A context belongs to one expression and is owned by one thread. Every
//! change to a substitution goes through the context so that cached results
//! depending on the variable are invalidated.

use crate::error::ContextError;
use crate::expression::Parts;
use crate::results::{CacheStats, Results};
use crate::value::Store;
use reckon_ir::OpId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// The value bound to one variable.
#[derive(Debug, Clone)]
pub struct Substitution<U> {
    name: Arc<str>,
    node: OpId,
    value: Option<U>,
}

impl<U> Substitution<U> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the variable's node.
    pub fn node(&self) -> OpId {
        self.node
    }

    /// Bound value, `None` while unset.
    pub fn value(&self) -> Option<&U> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

/// Substitutions and cached results for evaluating one expression.
///
/// `S` is the expression's store; substitutions are held in store `U` and
/// converted when read.
#[derive(Debug, Clone)]
pub struct Context<S: Store, U: Store = S> {
    pub(crate) parts: Arc<Parts<S>>,
    pub(crate) substitutions: Vec<Substitution<U>>,
    index: HashMap<Arc<str>, usize>,
    pub(crate) results: Results<S>,
}

impl<S: Store, U: Store> Context<S, U> {
    pub(crate) fn new(parts: Arc<Parts<S>>, cache: bool) -> Self {
        let substitutions: Vec<Substitution<U>> = reckon_ir::variables(&parts.ops)
            .map(|(node, _, name)| Substitution {
                name: Arc::clone(name),
                node,
                value: None,
            })
            .collect();

        let mut index = HashMap::with_capacity(substitutions.len());
        for (slot, sub) in substitutions.iter().enumerate() {
            index.entry(Arc::clone(&sub.name)).or_insert(slot);
        }

        let results = Results::new(parts.ops.len(), cache);
        Self {
            parts,
            substitutions,
            index,
            results,
        }
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.substitutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }

    /// Substitutions in variable declaration order.
    pub fn substitutions(&self) -> impl Iterator<Item = &Substitution<U>> {
        self.substitutions.iter()
    }

    /// Slot of the variable called `name`. With duplicate names, the first
    /// declared variable wins.
    pub fn slot(&self, name: &str) -> Result<usize, ContextError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ContextError::UnknownVariable {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Result<&Substitution<U>, ContextError> {
        let slot = self.slot(name)?;
        self.at(slot)
    }

    pub fn at(&self, slot: usize) -> Result<&Substitution<U>, ContextError> {
        self.substitutions
            .get(slot)
            .ok_or(ContextError::BadIndex {
                index: slot,
                len: self.substitutions.len(),
            })
    }

    /// Bind variable `slot` to `value`, invalidating dependent results.
    pub fn assign(&mut self, slot: usize, value: impl Into<U>) -> Result<(), ContextError> {
        self.replace(slot, Some(value.into()))
    }

    pub fn assign_by_name(&mut self, name: &str, value: impl Into<U>) -> Result<(), ContextError> {
        let slot = self.slot(name)?;
        self.assign(slot, value)
    }

    /// Unbind variable `slot`. Reading it again fails until it is reassigned.
    pub fn clear(&mut self, slot: usize) -> Result<(), ContextError> {
        self.replace(slot, None)
    }

    fn replace(&mut self, slot: usize, value: Option<U>) -> Result<(), ContextError> {
        let len = self.substitutions.len();
        let sub = self
            .substitutions
            .get_mut(slot)
            .ok_or(ContextError::BadIndex { index: slot, len })?;
        sub.value = value;
        trace!(name = %sub.name, slot, "substitution changed");
        self.results.invalidate(&self.parts.invalidations[slot]);
        Ok(())
    }

    /// True when every variable is bound.
    pub fn is_complete(&self) -> bool {
        self.substitutions.iter().all(Substitution::is_set)
    }

    pub fn cache_enabled(&self) -> bool {
        self.results.cache_enabled()
    }

    /// True when node `id` holds a result that is still valid.
    pub fn is_cached(&self, id: OpId) -> bool {
        self.results.is_valid(id)
    }

    pub fn stats(&self) -> CacheStats {
        self.results.stats()
    }

    pub fn reset_stats(&mut self) {
        self.results.reset_stats();
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::Builder;
    use crate::error::ContextError;
    use crate::value::Value;
    use reckon_ir::BinOp;

    fn sum() -> crate::Expression<Value> {
        let mut b = Builder::new();
        let a = b.var("a").unwrap();
        let c = b.var("c").unwrap();
        b.binary(BinOp::Add, a, c).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_lookup() {
        let expr = sum();
        let ctx = expr.context_default();
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.slot("c"), Ok(1));
        assert_eq!(ctx.get("a").unwrap().node(), 0);
        assert_eq!(
            ctx.get("zz").unwrap_err(),
            ContextError::UnknownVariable {
                name: "zz".to_string()
            }
        );
        assert_eq!(
            ctx.at(2).unwrap_err(),
            ContextError::BadIndex { index: 2, len: 2 }
        );
        let names: Vec<&str> = ctx.substitutions().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_assign_and_clear() {
        let expr = sum();
        let mut ctx = expr.context_default();
        assert!(!ctx.is_complete());
        ctx.assign(0, 1).unwrap();
        ctx.assign_by_name("c", Value::Null).unwrap();
        assert!(ctx.is_complete());
        assert_eq!(ctx.get("c").unwrap().value(), Some(&Value::Null));

        ctx.clear(1).unwrap();
        assert!(!ctx.is_complete());
        assert!(ctx.assign(9, 1).is_err());
        assert!(ctx.assign_by_name("nope", 1).is_err());
    }
}
