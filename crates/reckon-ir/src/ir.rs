//! Flattened operation list for reckon expressions.
//!
//! An expression is stored as a `Vec<Node>` where every node only refers to
//! nodes with a smaller index. The last node is the root.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Operation identifier: a position in the operation list.
pub type OpId = usize;

/// Extension function identifier: a position in a function pool.
pub type FunId = usize;

/// Direct dependencies of a node. No built-in node has more than three
/// without spilling to the heap.
pub type Refs = SmallVec<[OpId; 3]>;

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation, `-`.
    Neg,
    /// Logical negation, `!`.
    Not,
    /// Bitwise complement, `~`.
    BitNot,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 3] = [UnaryOp::Neg, UnaryOp::Not, UnaryOp::BitNot];

    /// Operator name used in listings and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "negate",
            UnaryOp::Not => "logical_not",
            UnaryOp::BitNot => "bit_not",
        }
    }

    /// Operator sign used by the textual grammar.
    pub fn sign(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }

    pub fn from_sign(sign: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.sign() == sign)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
}

impl BinOp {
    pub const ALL: [BinOp; 16] = [
        BinOp::Add,
        BinOp::Sub,
        BinOp::Mul,
        BinOp::Div,
        BinOp::Mod,
        BinOp::Eq,
        BinOp::Ne,
        BinOp::Gt,
        BinOp::Lt,
        BinOp::Ge,
        BinOp::Le,
        BinOp::And,
        BinOp::Or,
        BinOp::BitAnd,
        BinOp::BitOr,
        BinOp::BitXor,
    ];

    /// Operator name used in listings and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            BinOp::Add => "plus",
            BinOp::Sub => "minus",
            BinOp::Mul => "multiplies",
            BinOp::Div => "divides",
            BinOp::Mod => "modulus",
            BinOp::Eq => "equal_to",
            BinOp::Ne => "not_equal_to",
            BinOp::Gt => "greater",
            BinOp::Lt => "less",
            BinOp::Ge => "greater_equal",
            BinOp::Le => "less_equal",
            BinOp::And => "logical_and",
            BinOp::Or => "logical_or",
            BinOp::BitAnd => "bit_and",
            BinOp::BitOr => "bit_or",
            BinOp::BitXor => "bit_xor",
        }
    }

    /// Operator sign used by the textual grammar.
    pub fn sign(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Gt => ">",
            BinOp::Lt => "<",
            BinOp::Ge => ">=",
            BinOp::Le => "<=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
        }
    }

    pub fn from_sign(sign: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.sign() == sign)
    }

    /// True for operators whose result is always boolean.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le
        )
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single step of a flattened expression.
///
/// Equality and hashing are structural: two nodes with the same kind,
/// operator and dependencies are interchangeable, which is what the builder
/// relies on for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// Constant stored in the expression's constant pool.
    Const { slot: usize },
    /// Variable substituted through an evaluation context.
    Var { slot: usize, name: Arc<str> },
    /// Unary operation.
    Unary { op: UnaryOp, arg: OpId },
    /// Binary operation.
    Binary { op: BinOp, lhs: OpId, rhs: OpId },
    /// Conditional branch. Only the condition and the selected branch are
    /// evaluated.
    Ternary {
        cond: OpId,
        then: OpId,
        otherwise: OpId,
    },
    /// Call into an extension function pool.
    Extension {
        fun: FunId,
        name: Arc<str>,
        args: Vec<OpId>,
    },
}

impl Node {
    /// Call `to` once per direct dependency, in evaluation order.
    ///
    /// Leaves have no dependencies: their slots index external pools, not
    /// the operation list.
    pub fn refers(&self, mut to: impl FnMut(OpId)) {
        match self {
            Node::Const { .. } | Node::Var { .. } => {}
            Node::Unary { arg, .. } => to(*arg),
            Node::Binary { lhs, rhs, .. } => {
                to(*lhs);
                to(*rhs);
            }
            Node::Ternary {
                cond,
                then,
                otherwise,
            } => {
                to(*cond);
                to(*then);
                to(*otherwise);
            }
            Node::Extension { args, .. } => args.iter().copied().for_each(to),
        }
    }

    /// Direct dependencies, in evaluation order.
    pub fn references(&self) -> Refs {
        let mut refs = Refs::new();
        self.refers(|id| refs.push(id));
        refs
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Const { .. } | Node::Var { .. })
    }

    /// Short label of the node's operation, used in diagnostics.
    pub fn label(&self) -> String {
        match self {
            Node::Const { .. } => "const".to_string(),
            Node::Var { name, .. } => format!("${name}"),
            Node::Unary { op, .. } => op.name().to_string(),
            Node::Binary { op, .. } => op.name().to_string(),
            Node::Ternary { .. } => "if".to_string(),
            Node::Extension { name, .. } => format!("@{name}"),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Const { slot } => write!(f, "const(_{slot})"),
            Node::Var { slot, name } => write!(f, "{name}(${slot})"),
            Node::Unary { op, arg } => write!(f, "{op}(#{arg})"),
            Node::Binary { op, lhs, rhs } => write!(f, "{op}(#{lhs}, #{rhs})"),
            Node::Ternary {
                cond,
                then,
                otherwise,
            } => write!(f, "if(#{cond} ? #{then} : #{otherwise})"),
            Node::Extension { name, args, .. } => {
                write!(f, "@{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "#{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Display adaptor that renders an operation list one node per line.
pub struct Listing<'a>(pub &'a [Node]);

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, node) in self.0.iter().enumerate() {
            writeln!(f, "\t#{id}: {node}")?;
        }
        Ok(())
    }
}

/// Render an operation list for diagnostics.
pub fn listing(ops: &[Node]) -> Listing<'_> {
    Listing(ops)
}

/// Variable declarations of an operation list, in declaration order:
/// `(node id, slot, name)`.
pub fn variables(ops: &[Node]) -> impl Iterator<Item = (OpId, usize, &Arc<str>)> {
    ops.iter().enumerate().filter_map(|(id, node)| match node {
        Node::Var { slot, name } => Some((id, *slot, name)),
        _ => None,
    })
}
