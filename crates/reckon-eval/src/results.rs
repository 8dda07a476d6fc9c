//! Per-context cache of node results.

use crate::error::EvalResult;
use reckon_ir::{Bitmap, OpId};

/// Cache hit/miss counters of one context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Node results served from the cache.
    pub hits: u64,
    /// Node results computed.
    pub misses: u64,
}

/// Results of every node of one expression, with a validity bitmap.
///
/// Errors are stored like values. With caching disabled, validity is reset at
/// the start of each evaluation, so results only live for one call.
#[derive(Debug, Clone)]
pub struct Results<S> {
    outcomes: Vec<Option<EvalResult<S>>>,
    valid: Bitmap,
    cache: bool,
    stats: CacheStats,
}

impl<S: Clone> Results<S> {
    pub fn new(len: usize, cache: bool) -> Self {
        Self {
            outcomes: vec![None; len],
            valid: Bitmap::new(len),
            cache,
            stats: CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache
    }

    /// Start an evaluation call.
    pub fn begin(&mut self) {
        if !self.cache {
            self.valid.clear();
        }
    }

    /// Valid cached result of node `id`, counting a hit or a miss.
    pub fn lookup(&mut self, id: OpId) -> Option<EvalResult<S>> {
        if self.valid.get(id) {
            if let Some(outcome) = &self.outcomes[id] {
                self.stats.hits += 1;
                return Some(outcome.clone());
            }
        }
        self.stats.misses += 1;
        None
    }

    pub fn store(&mut self, id: OpId, outcome: EvalResult<S>) {
        self.outcomes[id] = Some(outcome);
        self.valid.set(id);
    }

    /// Last stored result of node `id`, whether or not it is still valid.
    pub fn last(&self, id: OpId) -> Option<&EvalResult<S>> {
        self.outcomes.get(id)?.as_ref()
    }

    pub fn is_valid(&self, id: OpId) -> bool {
        self.valid.get(id)
    }

    /// Drop validity of every node set in `mask`.
    pub fn invalidate(&mut self, mask: &Bitmap) {
        self.valid.and_not(mask);
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    #[test]
    fn test_lookup_and_invalidate() {
        let mut results: Results<i64> = Results::new(3, true);
        results.begin();
        assert_eq!(results.lookup(0), None);
        results.store(0, Ok(1));
        results.store(2, Err(EvalError::DivisionByZero { op: "divides" }));
        assert_eq!(results.lookup(0), Some(Ok(1)));
        assert_eq!(results.lookup(2), Some(Err(EvalError::DivisionByZero { op: "divides" })));

        let mut mask = Bitmap::new(3);
        mask.set(0);
        results.invalidate(&mask);
        assert!(!results.is_valid(0));
        assert!(results.is_valid(2));
        assert_eq!(results.last(0), Some(&Ok(1)));
        assert_eq!(results.stats(), CacheStats { hits: 2, misses: 1 });
    }

    #[test]
    fn test_disabled_cache_resets_each_call() {
        let mut results: Results<i64> = Results::new(1, false);
        results.begin();
        results.store(0, Ok(7));
        assert_eq!(results.lookup(0), Some(Ok(7)));
        results.begin();
        assert_eq!(results.lookup(0), None);
    }
}
