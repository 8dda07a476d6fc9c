//! Incremental construction of expressions.
//!
//! Every call appends at most one node and returns its id. Structurally equal
//! nodes are appended once: asking for the same operation on the same
//! arguments returns the existing id, so common sub-expressions are shared.

use crate::expression::{Expression, Parts};
use crate::ext::Pool;
use crate::value::{Operand, Store};
use reckon_ir::{
    check_parts, check_reference, invalidations, listing, validate, BinOp, BuildError,
    BuildResult, Node, OpId, UnaryOp,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builder limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Maximum number of nodes, unlimited when `None`.
    pub max_ops: Option<usize>,
}

/// Hashable identity of a constant. NaN has none and is never shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
}

impl ConstKey {
    fn of(value: Operand<'_>) -> Option<Self> {
        Some(match value {
            Operand::Null => ConstKey::Null,
            Operand::Bool(b) => ConstKey::Bool(b),
            Operand::Int(n) => ConstKey::Int(n),
            Operand::Float(x) if x.is_nan() => return None,
            Operand::Float(x) => ConstKey::Float(x.to_bits()),
            Operand::Text(s) => ConstKey::Text(s.to_string()),
        })
    }
}

/// Expression builder.
#[derive(Debug)]
pub struct Builder<S: Store> {
    /// Operation list under construction.
    ops: Vec<Node>,
    /// Constant pool.
    consts: Vec<S>,
    /// Extension functions available to `fun`.
    pool: Arc<Pool<S>>,
    config: BuilderConfig,
    /// Structural index of appended nodes.
    nodes: HashMap<Node, OpId>,
    /// Constant node by value.
    constants: HashMap<ConstKey, OpId>,
    /// Variable node by name.
    names: HashMap<Arc<str>, OpId>,
    /// Next substitution slot.
    vars: usize,
}

impl<S: Store> Builder<S> {
    /// A builder without extension functions.
    pub fn new() -> Self {
        Self::with_pool(Arc::new(Pool::new()))
    }

    /// A builder that resolves `fun` calls in `pool`.
    pub fn with_pool(pool: Arc<Pool<S>>) -> Self {
        Self {
            ops: Vec::new(),
            consts: Vec::new(),
            pool,
            config: BuilderConfig::default(),
            nodes: HashMap::new(),
            constants: HashMap::new(),
            names: HashMap::new(),
            vars: 0,
        }
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Resume building from raw parts, e.g. a deserialized expression.
    ///
    /// Each node is checked against the nodes before it: references must
    /// point backwards, constant slots must exist in `consts`, and variable
    /// slots must follow declaration order. The remaining checks run in
    /// [`build`](Self::build).
    pub fn from_parts(consts: Vec<S>, ops: Vec<Node>, pool: Arc<Pool<S>>) -> BuildResult<Self> {
        let vars = check_parts(&ops, consts.len())?;

        let mut builder = Self::with_pool(pool);
        for (id, node) in ops.iter().enumerate() {
            match node {
                Node::Const { slot } => {
                    if let Some(key) = ConstKey::of(consts[*slot].operand()) {
                        builder.constants.entry(key).or_insert(id);
                    }
                }
                Node::Var { name, .. } => {
                    builder.names.entry(Arc::clone(name)).or_insert(id);
                }
                _ => {}
            }
            builder.nodes.entry(node.clone()).or_insert(id);
        }
        builder.ops = ops;
        builder.consts = consts;
        builder.vars = vars;
        Ok(builder)
    }

    /// Number of nodes appended so far.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[Node] {
        &self.ops
    }

    pub fn consts(&self) -> &[S] {
        &self.consts
    }

    pub fn pool(&self) -> &Arc<Pool<S>> {
        &self.pool
    }

    /// Append a constant. Equal constants share one node.
    pub fn constant(&mut self, value: impl Into<S>) -> BuildResult<OpId> {
        let value = value.into();
        let key = ConstKey::of(value.operand());
        if let Some(id) = key.as_ref().and_then(|k| self.constants.get(k)) {
            return Ok(*id);
        }
        self.check_room()?;
        let id = self.push(Node::Const {
            slot: self.consts.len(),
        });
        self.consts.push(value);
        if let Some(key) = key {
            self.constants.insert(key, id);
        }
        Ok(id)
    }

    /// Append the null constant.
    pub fn null(&mut self) -> BuildResult<OpId> {
        self.constant(S::null())
    }

    /// Append a variable. A name already declared returns its node.
    pub fn var(&mut self, name: &str) -> BuildResult<OpId> {
        if let Some(id) = self.names.get(name) {
            return Ok(*id);
        }
        self.check_room()?;
        let name: Arc<str> = Arc::from(name);
        let id = self.push(Node::Var {
            slot: self.vars,
            name: Arc::clone(&name),
        });
        self.vars += 1;
        self.names.insert(name, id);
        Ok(id)
    }

    pub fn unary(&mut self, op: UnaryOp, arg: OpId) -> BuildResult<OpId> {
        check_reference(&self.ops, op.name(), arg)?;
        self.append(Node::Unary { op, arg })
    }

    pub fn binary(&mut self, op: BinOp, lhs: OpId, rhs: OpId) -> BuildResult<OpId> {
        check_reference(&self.ops, op.name(), lhs)?;
        check_reference(&self.ops, op.name(), rhs)?;
        self.append(Node::Binary { op, lhs, rhs })
    }

    /// Append `if (cond) then else otherwise`.
    pub fn branch(&mut self, cond: OpId, then: OpId, otherwise: OpId) -> BuildResult<OpId> {
        for id in [cond, then, otherwise] {
            check_reference(&self.ops, "if", id)?;
        }
        self.append(Node::Ternary {
            cond,
            then,
            otherwise,
        })
    }

    /// Append a call to the extension function `name`.
    pub fn fun(&mut self, name: &str, args: Vec<OpId>) -> BuildResult<OpId> {
        let label = format!("@{name}");
        for id in &args {
            check_reference(&self.ops, &label, *id)?;
        }
        let fun = self.pool.id(name).ok_or_else(|| BuildError::BadFunction {
            name: name.to_string(),
        })?;
        self.append(Node::Extension {
            fun,
            name: Arc::from(name),
            args,
        })
    }

    /// Validate the whole operation list and seal it into an expression.
    ///
    /// The last appended node is the root. Every other node must be
    /// reachable from it.
    pub fn build(self) -> BuildResult<Expression<S>> {
        validate(&self.ops, self.consts.len(), self.vars)?;
        let invalidations = invalidations(&self.ops, false);
        debug!(
            ops = self.ops.len(),
            consts = self.consts.len(),
            vars = self.vars,
            "built expression"
        );
        Ok(Expression::new(Parts {
            ops: self.ops,
            consts: self.consts,
            pool: self.pool,
            invalidations,
        }))
    }

    fn append(&mut self, node: Node) -> BuildResult<OpId> {
        if let Some(id) = self.nodes.get(&node) {
            return Ok(*id);
        }
        self.check_room()?;
        Ok(self.push(node))
    }

    fn check_room(&self) -> BuildResult<()> {
        match self.config.max_ops {
            Some(limit) if self.ops.len() >= limit => Err(BuildError::TooManyOps { limit }),
            _ => Ok(()),
        }
    }

    fn push(&mut self, node: Node) -> OpId {
        let id = self.ops.len();
        self.nodes.insert(node.clone(), id);
        self.ops.push(node);
        id
    }
}

impl<S: Store> Default for Builder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> fmt::Display for Builder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operations:\n{}", listing(&self.ops))?;
        f.write_str("\nConstants:\n")?;
        for (slot, value) in self.consts.iter().enumerate() {
            writeln!(f, "\t_{slot}: {value}")?;
        }
        f.write_str("\nExtension functions:\n")?;
        for (name, id) in self.pool.iter() {
            writeln!(f, "\t@{id}: {name}")?;
        }
        Ok(())
    }
}
