//! Generators and reference oracles shared by the soundness tests.
//!
//! [`Shape`] is a plain expression tree that can be turned into an
//! [`Expression`] two ways, through the builder API and through source text,
//! so that the two paths can be checked against each other.

use proptest::prelude::*;
use reckon_eval::{BinOp, BuildResult, Builder, Expression, Node, OpId, Pool, UnaryOp, Value};
use std::sync::Arc;

/// Variable names a [`Shape`] can refer to.
pub const VAR_NAMES: [&str; 4] = ["a", "b", "c", "d"];

/// Expression tree over integer constants.
#[derive(Debug, Clone)]
pub enum Shape {
    Int(i64),
    Null,
    /// Index into [`VAR_NAMES`].
    Var(usize),
    Unary(UnaryOp, Box<Shape>),
    Binary(BinOp, Box<Shape>, Box<Shape>),
    Branch(Box<Shape>, Box<Shape>, Box<Shape>),
    Avail(Vec<Shape>),
}

pub fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (-20i64..20).prop_map(Shape::Int),
        Just(Shape::Null),
        (0..VAR_NAMES.len()).prop_map(Shape::Var),
    ];
    leaf.prop_recursive(6, 64, 4, |inner| {
        prop_oneof![
            (prop::sample::select(UnaryOp::ALL.to_vec()), inner.clone())
                .prop_map(|(op, arg)| Shape::Unary(op, Box::new(arg))),
            (
                prop::sample::select(BinOp::ALL.to_vec()),
                inner.clone(),
                inner.clone()
            )
                .prop_map(|(op, lhs, rhs)| Shape::Binary(op, Box::new(lhs), Box::new(rhs))),
            (inner.clone(), inner.clone(), inner.clone()).prop_map(|(cond, then, otherwise)| {
                Shape::Branch(Box::new(cond), Box::new(then), Box::new(otherwise))
            }),
            prop::collection::vec(inner, 0..4).prop_map(Shape::Avail),
        ]
    })
}

/// Append `shape` to `builder`, returning the id of its top node.
pub fn assemble(shape: &Shape, builder: &mut Builder<Value>) -> BuildResult<OpId> {
    match shape {
        Shape::Int(n) => builder.constant(*n),
        Shape::Null => builder.null(),
        Shape::Var(i) => builder.var(VAR_NAMES[*i]),
        Shape::Unary(op, arg) => {
            let arg = assemble(arg, builder)?;
            builder.unary(*op, arg)
        }
        Shape::Binary(op, lhs, rhs) => {
            let lhs = assemble(lhs, builder)?;
            let rhs = assemble(rhs, builder)?;
            builder.binary(*op, lhs, rhs)
        }
        Shape::Branch(cond, then, otherwise) => {
            let cond = assemble(cond, builder)?;
            let then = assemble(then, builder)?;
            let otherwise = assemble(otherwise, builder)?;
            builder.branch(cond, then, otherwise)
        }
        Shape::Avail(args) => {
            let args = args
                .iter()
                .map(|arg| assemble(arg, builder))
                .collect::<BuildResult<Vec<_>>>()?;
            builder.fun("avail", args)
        }
    }
}

/// Builder with the built-in extension functions.
pub fn builder() -> Builder<Value> {
    Builder::with_pool(Arc::new(Pool::builtin()))
}

/// Build `shape` through the builder API.
pub fn build(shape: &Shape) -> BuildResult<Expression<Value>> {
    let mut builder = builder();
    assemble(shape, &mut builder)?;
    builder.build()
}

/// Render `shape` as source text in canonical form.
pub fn source(shape: &Shape) -> String {
    match shape {
        Shape::Int(n) => format!("int{{{n}}}"),
        Shape::Null => "null".to_string(),
        Shape::Var(i) => format!("${{{}}}", VAR_NAMES[*i]),
        Shape::Unary(op, arg) => format!("({}{})", op.sign(), source(arg)),
        Shape::Binary(op, lhs, rhs) => {
            format!("({} {} {})", source(lhs), op.sign(), source(rhs))
        }
        Shape::Branch(cond, then, otherwise) => format!(
            "if({}, {}, {})",
            source(cond),
            source(then),
            source(otherwise)
        ),
        Shape::Avail(args) => {
            let args: Vec<String> = args.iter().map(source).collect();
            format!("@avail({})", args.join(", "))
        }
    }
}

/// An operation list as it might arrive from outside a builder.
#[derive(Debug, Clone)]
pub struct RawList {
    pub ops: Vec<Node>,
    pub consts: usize,
    pub vars: usize,
}

/// Operation lists with arbitrary references, including forward and
/// out-of-range ones, and slots that may fall outside their pools.
pub fn raw_list() -> impl Strategy<Value = RawList> {
    (1usize..10, 0usize..3, 0usize..3).prop_flat_map(|(len, consts, vars)| {
        prop::collection::vec(raw_node(len, consts, vars), len)
            .prop_map(move |ops| RawList { ops, consts, vars })
    })
}

fn raw_node(len: usize, consts: usize, vars: usize) -> impl Strategy<Value = Node> {
    let refs = 0..len + 1;
    prop_oneof![
        (0..consts + 1).prop_map(|slot| Node::Const { slot }),
        (0..vars + 1).prop_map(|slot| Node::Var {
            slot,
            name: Arc::from(format!("v{slot}")),
        }),
        (prop::sample::select(UnaryOp::ALL.to_vec()), refs.clone())
            .prop_map(|(op, arg)| Node::Unary { op, arg }),
        (
            prop::sample::select(BinOp::ALL.to_vec()),
            refs.clone(),
            refs.clone()
        )
            .prop_map(|(op, lhs, rhs)| Node::Binary { op, lhs, rhs }),
        (refs.clone(), refs.clone(), refs.clone()).prop_map(|(cond, then, otherwise)| {
            Node::Ternary {
                cond,
                then,
                otherwise,
            }
        }),
        prop::collection::vec(refs, 0..3).prop_map(|args| Node::Extension {
            fun: 0,
            name: Arc::from("avail"),
            args,
        }),
    ]
}

/// Reference answer for whole-list validation.
///
/// Sweeps from the root downwards, marking dependencies reachable; every
/// reachable node must refer only to earlier nodes and every node must end
/// up reachable.
pub fn naive_validate(ops: &[Node], consts: usize, vars: usize) -> bool {
    let Some(root) = ops.len().checked_sub(1) else {
        return false;
    };
    let mut reachable = vec![false; ops.len()];
    reachable[root] = true;
    for id in (0..ops.len()).rev() {
        if !reachable[id] {
            continue;
        }
        let ok = match &ops[id] {
            Node::Const { slot } => *slot < consts,
            Node::Var { slot, .. } => *slot < vars,
            node => node.references().iter().all(|&r| r < id),
        };
        if !ok {
            return false;
        }
        for r in ops[id].references() {
            reachable[r] = true;
        }
    }
    reachable.iter().all(|&seen| seen)
}

/// True when node `id` reads node `target`, directly or transitively.
pub fn depends_on(ops: &[Node], id: OpId, target: OpId) -> bool {
    id == target
        || ops[id]
            .references()
            .iter()
            .any(|&dep| depends_on(ops, dep, target))
}
