//! Dependency analysis: which nodes a variable change invalidates.

use crate::ir::{Node, OpId};
use std::fmt;
use tracing::debug;

const WORD: usize = u64::BITS as usize;

/// Fixed-length bitmap over node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitmap {
    words: Vec<u64>,
    len: usize,
}

impl Bitmap {
    /// All bits clear.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD)],
            len,
        }
    }

    /// All bits set.
    pub fn full(len: usize) -> Self {
        let mut map = Self {
            words: vec![u64::MAX; len.div_ceil(WORD)],
            len,
        };
        map.trim();
        map
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, id: OpId) -> bool {
        id < self.len && self.words[id / WORD] & (1 << (id % WORD)) != 0
    }

    pub fn set(&mut self, id: OpId) {
        self.words[id / WORD] |= 1 << (id % WORD);
    }

    pub fn unset(&mut self, id: OpId) {
        self.words[id / WORD] &= !(1 << (id % WORD));
    }

    /// Clear every bit.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// `self &= other`
    pub fn and(&mut self, other: &Bitmap) {
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w &= o;
        }
    }

    /// `self &= !other`
    pub fn and_not(&mut self, other: &Bitmap) {
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w &= !o;
        }
    }

    /// Flip every bit.
    pub fn not(&mut self) {
        for w in &mut self.words {
            *w = !*w;
        }
        self.trim();
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Ids of the set bits, ascending.
    pub fn ones(&self) -> impl Iterator<Item = OpId> + '_ {
        (0..self.len).filter(|id| self.get(*id))
    }

    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len).map(|id| self.get(id)).collect()
    }

    fn trim(&mut self) {
        let tail = self.len % WORD;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1 << tail) - 1;
            }
        }
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in 0..self.len {
            f.write_str(if self.get(id) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Invalidation maps, one per variable in declaration order.
///
/// Bit `i` of a variable's map is set when node `i` is the variable itself or
/// depends on it transitively, i.e. when it must be recomputed after the
/// variable's substitution changes. With `invert` the complement is stored:
/// the nodes whose cached results survive the change.
///
/// The list must be validated: dependencies precede their users, so a single
/// forward pass per variable suffices.
pub fn invalidations(ops: &[Node], invert: bool) -> Vec<Bitmap> {
    let maps: Vec<Bitmap> = ops
        .iter()
        .enumerate()
        .filter(|(_, node)| matches!(node, Node::Var { .. }))
        .map(|(var, _)| {
            let mut map = Bitmap::new(ops.len());
            map.set(var);
            for (id, node) in ops.iter().enumerate().skip(var + 1) {
                let mut hit = false;
                node.refers(|dep| hit |= map.get(dep));
                if hit {
                    map.set(id);
                }
            }
            if invert {
                map.not();
            }
            map
        })
        .collect();

    debug!(vars = maps.len(), ops = ops.len(), invert, "computed invalidation maps");
    maps
}
