//! Whole-graph structural validation of operation lists.
//!
//! The builder checks each appended reference eagerly; the checks here run
//! over a finished list and catch what per-call checks cannot: unreachable
//! nodes, forward references in externally supplied lists, and leaf slots
//! outside their pools.

use crate::error::{BuildError, BuildResult};
use crate::ir::{listing, Node, OpId, Refs};
use tracing::trace;

/// Check that `reference` names an existing node of `ops`.
///
/// `op` labels the operation being appended, for the diagnostic.
pub fn check_reference(ops: &[Node], op: &str, reference: OpId) -> BuildResult<()> {
    if reference < ops.len() {
        Ok(())
    } else {
        Err(BuildError::RefToUnknown {
            op: op.to_string(),
            reference,
            len: ops.len(),
        })
    }
}

/// Per-node checks for a list supplied from outside a builder.
///
/// Walks the list in order and reports the first node that refers forward
/// (or to itself), the first constant slot outside `consts`, and the first
/// variable whose slot does not match its declaration order. Returns the
/// number of declared variables.
pub fn check_parts(ops: &[Node], consts: usize) -> BuildResult<usize> {
    let mut vars = 0;
    for (id, node) in ops.iter().enumerate() {
        match node {
            Node::Const { slot } => {
                if *slot >= consts {
                    return Err(bad_substitution(ops, id, *slot, consts));
                }
            }
            Node::Var { slot, .. } => {
                if *slot != vars {
                    return Err(bad_substitution(ops, id, *slot, vars + 1));
                }
                vars += 1;
            }
            _ => {
                if let Some(reference) = node.references().into_iter().find(|r| *r >= id) {
                    return Err(bad_argument(ops, id, reference));
                }
            }
        }
    }
    Ok(vars)
}

/// Validate a finished operation list.
///
/// Performs a depth-first walk from the root (the last node): every
/// dependency must precede the node that uses it, leaf slots must fall inside
/// the constant pool (`consts`) and the substitution table (`vars`), and
/// every node must be reachable from the root.
pub fn validate(ops: &[Node], consts: usize, vars: usize) -> BuildResult<()> {
    let root = ops.len().checked_sub(1).ok_or(BuildError::Empty)?;

    let mut visited = vec![false; ops.len()];
    // (node, its dependencies, next dependency to descend into)
    let mut stack: Vec<(OpId, Refs, usize)> = Vec::new();

    enter(ops, root, consts, vars, &mut visited, &mut stack)?;
    while let Some((id, refs, next)) = stack.last_mut() {
        let Some(&dep) = refs.get(*next) else {
            stack.pop();
            continue;
        };
        *next += 1;
        if dep >= *id {
            return Err(bad_argument(ops, *id, dep));
        }
        if !visited[dep] {
            enter(ops, dep, consts, vars, &mut visited, &mut stack)?;
        }
    }

    if let Some(id) = visited.iter().position(|seen| !seen) {
        return Err(BuildError::Dangling {
            id,
            ops: listing(ops).to_string(),
        });
    }

    trace!(ops = ops.len(), "operation list validated");
    Ok(())
}

fn enter(
    ops: &[Node],
    id: OpId,
    consts: usize,
    vars: usize,
    visited: &mut [bool],
    stack: &mut Vec<(OpId, Refs, usize)>,
) -> BuildResult<()> {
    visited[id] = true;
    match &ops[id] {
        Node::Const { slot } if *slot >= consts => Err(bad_substitution(ops, id, *slot, consts)),
        Node::Var { slot, .. } if *slot >= vars => Err(bad_substitution(ops, id, *slot, vars)),
        Node::Const { .. } | Node::Var { .. } => Ok(()),
        node => {
            stack.push((id, node.references(), 0));
            Ok(())
        }
    }
}

fn bad_argument(ops: &[Node], id: OpId, reference: OpId) -> BuildError {
    BuildError::BadArgument {
        id,
        op: ops[id].to_string(),
        reference,
        ops: listing(ops).to_string(),
    }
}

fn bad_substitution(ops: &[Node], id: OpId, slot: usize, len: usize) -> BuildError {
    BuildError::BadSubstitution {
        id,
        op: ops[id].to_string(),
        slot,
        len,
        ops: listing(ops).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, UnaryOp};

    fn var(slot: usize, name: &str) -> Node {
        Node::Var {
            slot,
            name: name.into(),
        }
    }

    fn add(lhs: OpId, rhs: OpId) -> Node {
        Node::Binary {
            op: BinOp::Add,
            lhs,
            rhs,
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(validate(&[], 0, 0), Err(BuildError::Empty));
    }

    #[test]
    fn test_valid_dag() {
        let ops = vec![
            Node::Const { slot: 0 },
            var(0, "a"),
            add(0, 1),
            Node::Unary {
                op: UnaryOp::Neg,
                arg: 2,
            },
            add(2, 3),
        ];
        assert_eq!(validate(&ops, 1, 1), Ok(()));
    }

    #[test]
    fn test_dangling() {
        let ops = vec![Node::Const { slot: 0 }, var(0, "a"), var(1, "b"), add(0, 2)];
        match validate(&ops, 1, 2) {
            Err(BuildError::Dangling { id, .. }) => assert_eq!(id, 1),
            other => panic!("expected dangling node, got {other:?}"),
        }
    }

    #[test]
    fn test_forward_reference() {
        let ops = vec![Node::Const { slot: 0 }, add(0, 2), add(1, 0)];
        match validate(&ops, 1, 0) {
            Err(BuildError::BadArgument { id, reference, .. }) => {
                assert_eq!((id, reference), (1, 2));
            }
            other => panic!("expected bad argument, got {other:?}"),
        }
    }

    #[test]
    fn test_self_reference() {
        let ops = vec![Node::Unary {
            op: UnaryOp::Not,
            arg: 0,
        }];
        assert!(matches!(
            validate(&ops, 0, 0),
            Err(BuildError::BadArgument { id: 0, reference: 0, .. })
        ));
    }

    #[test]
    fn test_bad_slots() {
        let ops = vec![Node::Const { slot: 3 }];
        assert!(matches!(
            validate(&ops, 1, 0),
            Err(BuildError::BadSubstitution { slot: 3, len: 1, .. })
        ));

        let ops = vec![var(2, "x")];
        assert!(matches!(
            validate(&ops, 0, 1),
            Err(BuildError::BadSubstitution { slot: 2, .. })
        ));
    }

    #[test]
    fn test_check_parts() {
        let ops = vec![Node::Const { slot: 0 }, var(0, "a"), var(1, "b"), add(1, 2)];
        assert_eq!(check_parts(&ops, 1), Ok(2));

        let ops = vec![Node::Const { slot: 1 }];
        assert!(matches!(
            check_parts(&ops, 1),
            Err(BuildError::BadSubstitution { id: 0, .. })
        ));

        let ops = vec![var(0, "a"), add(0, 1), var(1, "b")];
        assert!(matches!(
            check_parts(&ops, 0),
            Err(BuildError::BadArgument {
                id: 1,
                reference: 1,
                ..
            })
        ));

        let ops = vec![var(1, "a")];
        assert!(matches!(
            check_parts(&ops, 0),
            Err(BuildError::BadSubstitution { id: 0, slot: 1, .. })
        ));
    }

    #[test]
    fn test_check_reference() {
        let ops = vec![Node::Const { slot: 0 }];
        assert_eq!(check_reference(&ops, "plus", 0), Ok(()));
        assert_eq!(
            check_reference(&ops, "plus", 1),
            Err(BuildError::RefToUnknown {
                op: "plus".to_string(),
                reference: 1,
                len: 1,
            })
        );
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut ops = vec![Node::Const { slot: 0 }];
        for i in 0..100_000 {
            ops.push(Node::Unary {
                op: UnaryOp::Neg,
                arg: i,
            });
        }
        assert_eq!(validate(&ops, 1, 0), Ok(()));
    }
}
