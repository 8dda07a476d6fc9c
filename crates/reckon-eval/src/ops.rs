//! Type-checked application of the built-in operators.
//!
//! Every operator is computed on borrowed [`Operand`] views into an owned
//! [`Scalar`] (or null), and the result is handed to the target store. Any
//! operand combination without a rule, and any result the store cannot hold,
//! is an incompatible-types error.
//!
//! Null rules: arithmetic and bitwise operators absorb null; null equals only
//! null and sorts below every typed value; in logical context null is false.

use crate::error::{EvalError, EvalResult};
use crate::value::{Operand, Scalar, Store};
use reckon_ir::{BinOp, UnaryOp};
use std::cmp::Ordering;

/// Result of an operator before admission: `None` is null.
type Outcome = Option<Scalar>;

/// Apply a unary operator.
pub fn unary<S: Store>(op: UnaryOp, arg: &S) -> EvalResult<S> {
    let view = arg.operand();
    let outcome = apply_unary(op, view).ok_or_else(|| incompatible(op.name(), &[view]))??;
    admit(op.name(), outcome, &[view])
}

/// Apply a binary operator.
pub fn binary<S: Store>(op: BinOp, lhs: &S, rhs: &S) -> EvalResult<S> {
    let (l, r) = (lhs.operand(), rhs.operand());
    let outcome = apply_binary(op, l, r).ok_or_else(|| incompatible(op.name(), &[l, r]))??;
    admit(op.name(), outcome, &[l, r])
}

/// Boolean conversion used by logical operators and branch conditions.
///
/// Null, `false`, zero and `0.0` are false. Text has no boolean value.
pub fn truth(value: Operand<'_>) -> Option<bool> {
    match value {
        Operand::Null => Some(false),
        Operand::Bool(b) => Some(b),
        Operand::Int(n) => Some(n != 0),
        Operand::Float(x) => Some(x != 0.0),
        Operand::Text(_) => None,
    }
}

fn admit<S: Store>(op: &str, outcome: Outcome, args: &[Operand<'_>]) -> EvalResult<S> {
    match outcome {
        None => Ok(S::null()),
        Some(scalar) => S::admit(scalar).ok_or_else(|| incompatible(op, args)),
    }
}

fn incompatible(op: &str, args: &[Operand<'_>]) -> EvalError {
    EvalError::IncompatibleTypes {
        op: op.to_string(),
        types: args
            .iter()
            .map(Operand::type_name)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

// `None`: no rule for these operand types.
fn apply_unary(op: UnaryOp, arg: Operand<'_>) -> Option<EvalResult<Outcome>> {
    let outcome = match (op, arg) {
        (UnaryOp::Not, v) => Some(Scalar::Bool(!truth(v)?)),
        (_, Operand::Null) => None,
        (UnaryOp::Neg, Operand::Int(n)) => match n.checked_neg() {
            Some(n) => Some(Scalar::Int(n)),
            None => return Some(Err(EvalError::Overflow { op: op.name() })),
        },
        (UnaryOp::Neg, Operand::Float(x)) => Some(Scalar::Float(-x)),
        (UnaryOp::BitNot, Operand::Int(n)) => Some(Scalar::Int(!n)),
        _ => return None,
    };
    Some(Ok(outcome))
}

fn apply_binary(op: BinOp, l: Operand<'_>, r: Operand<'_>) -> Option<EvalResult<Outcome>> {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => arithmetic(op, l, r),
        BinOp::Eq | BinOp::Ne | BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le => {
            let ord = compare(l, r)?;
            let holds = match op {
                BinOp::Eq => ord == Some(Ordering::Equal),
                BinOp::Ne => ord != Some(Ordering::Equal),
                BinOp::Gt => ord == Some(Ordering::Greater),
                BinOp::Lt => ord == Some(Ordering::Less),
                BinOp::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                _ => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
            };
            Some(Ok(Some(Scalar::Bool(holds))))
        }
        BinOp::And | BinOp::Or => {
            // Both sides are checked whatever the left one holds.
            let (a, b) = (truth(l)?, truth(r)?);
            let holds = if op == BinOp::And { a && b } else { a || b };
            Some(Ok(Some(Scalar::Bool(holds))))
        }
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => bitwise(op, l, r),
    }
}

fn arithmetic(op: BinOp, l: Operand<'_>, r: Operand<'_>) -> Option<EvalResult<Outcome>> {
    let value = match (l, r) {
        (Operand::Null, _) | (_, Operand::Null) => return Some(Ok(None)),
        (Operand::Int(a), Operand::Int(b)) => return Some(integer(op, a, b).map(Some)),
        (Operand::Int(a), Operand::Float(b)) => float(op, a as f64, b)?,
        (Operand::Float(a), Operand::Int(b)) => float(op, a, b as f64)?,
        (Operand::Float(a), Operand::Float(b)) => float(op, a, b)?,
        (Operand::Text(a), Operand::Text(b)) if op == BinOp::Add => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Scalar::Text(joined)
        }
        _ => return None,
    };
    Some(Ok(Some(value)))
}

fn integer(op: BinOp, a: i64, b: i64) -> EvalResult<Scalar> {
    let name = op.name();
    if matches!(op, BinOp::Div | BinOp::Mod) && b == 0 {
        return Err(EvalError::DivisionByZero { op: name });
    }
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => a.checked_div(b),
        _ => a.checked_rem(b),
    };
    result
        .map(Scalar::Int)
        .ok_or(EvalError::Overflow { op: name })
}

// Floating modulus has no rule.
fn float(op: BinOp, a: f64, b: f64) -> Option<Scalar> {
    let x = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        _ => return None,
    };
    Some(Scalar::Float(x))
}

/// Ordering of two operands; `Some(None)` for unordered floats (NaN).
fn compare(l: Operand<'_>, r: Operand<'_>) -> Option<Option<Ordering>> {
    let ord = match (l, r) {
        (Operand::Null, Operand::Null) => Some(Ordering::Equal),
        (Operand::Null, _) => Some(Ordering::Less),
        (_, Operand::Null) => Some(Ordering::Greater),
        (Operand::Bool(a), Operand::Bool(b)) => Some(a.cmp(&b)),
        (Operand::Int(a), Operand::Int(b)) => Some(a.cmp(&b)),
        (Operand::Int(a), Operand::Float(b)) => (a as f64).partial_cmp(&b),
        (Operand::Float(a), Operand::Int(b)) => a.partial_cmp(&(b as f64)),
        (Operand::Float(a), Operand::Float(b)) => a.partial_cmp(&b),
        (Operand::Text(a), Operand::Text(b)) => Some(a.cmp(b)),
        _ => return None,
    };
    Some(ord)
}

fn bitwise(op: BinOp, l: Operand<'_>, r: Operand<'_>) -> Option<EvalResult<Outcome>> {
    let value = match (l, r) {
        (Operand::Null, _) | (_, Operand::Null) => return Some(Ok(None)),
        (Operand::Int(a), Operand::Int(b)) => Scalar::Int(match op {
            BinOp::BitAnd => a & b,
            BinOp::BitOr => a | b,
            _ => a ^ b,
        }),
        (Operand::Bool(a), Operand::Bool(b)) => Scalar::Bool(match op {
            BinOp::BitAnd => a & b,
            BinOp::BitOr => a | b,
            _ => a ^ b,
        }),
        _ => return None,
    };
    Some(Ok(Some(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Single, Value};

    fn bin(op: BinOp, l: impl Into<Value>, r: impl Into<Value>) -> EvalResult<Value> {
        binary(op, &l.into(), &r.into())
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(bin(BinOp::Add, 2, 3), Ok(Value::Int(5)));
        assert_eq!(bin(BinOp::Sub, 2, 3), Ok(Value::Int(-1)));
        assert_eq!(bin(BinOp::Mul, 4, 3), Ok(Value::Int(12)));
        assert_eq!(bin(BinOp::Div, 7, 2), Ok(Value::Int(3)));
        assert_eq!(bin(BinOp::Mod, 7, 2), Ok(Value::Int(1)));
    }

    #[test]
    fn test_integer_errors() {
        assert_eq!(
            bin(BinOp::Div, 1, 0),
            Err(EvalError::DivisionByZero { op: "divides" })
        );
        assert_eq!(
            bin(BinOp::Mod, 1, 0),
            Err(EvalError::DivisionByZero { op: "modulus" })
        );
        assert_eq!(
            bin(BinOp::Add, i64::MAX, 1),
            Err(EvalError::Overflow { op: "plus" })
        );
        assert_eq!(
            unary(UnaryOp::Neg, &Value::Int(i64::MIN)),
            Err(EvalError::Overflow { op: "negate" })
        );
    }

    #[test]
    fn test_float_and_promotion() {
        assert_eq!(bin(BinOp::Div, 1.0, 4.0), Ok(Value::Float(0.25)));
        assert_eq!(bin(BinOp::Add, 1, 0.5), Ok(Value::Float(1.5)));
        match bin(BinOp::Div, 1.0, 0.0) {
            Ok(Value::Float(x)) => assert!(x.is_infinite()),
            other => panic!("expected infinity, got {other:?}"),
        }
        assert!(matches!(
            bin(BinOp::Mod, 1.0, 2.0),
            Err(EvalError::IncompatibleTypes { .. })
        ));
    }

    #[test]
    fn test_null_absorption() {
        for op in [
            BinOp::Add,
            BinOp::Sub,
            BinOp::Mul,
            BinOp::Div,
            BinOp::Mod,
            BinOp::BitAnd,
            BinOp::BitOr,
            BinOp::BitXor,
        ] {
            assert_eq!(bin(op, Value::Null, 3), Ok(Value::Null), "{op}");
            assert_eq!(bin(op, 3, Value::Null), Ok(Value::Null), "{op}");
        }
        assert_eq!(unary(UnaryOp::Neg, &Value::Null), Ok(Value::Null));
        assert_eq!(unary(UnaryOp::BitNot, &Value::Null), Ok(Value::Null));
        assert_eq!(unary(UnaryOp::Not, &Value::Null), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_null_comparisons() {
        assert_eq!(bin(BinOp::Eq, Value::Null, Value::Null), Ok(Value::Bool(true)));
        assert_eq!(bin(BinOp::Eq, Value::Null, 0), Ok(Value::Bool(false)));
        assert_eq!(bin(BinOp::Ne, 0, Value::Null), Ok(Value::Bool(true)));
        assert_eq!(bin(BinOp::Lt, Value::Null, i64::MIN), Ok(Value::Bool(true)));
        assert_eq!(bin(BinOp::Gt, "a", Value::Null), Ok(Value::Bool(true)));
        assert_eq!(bin(BinOp::Le, Value::Null, Value::Null), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_logical() {
        assert_eq!(bin(BinOp::And, Value::Null, true), Ok(Value::Bool(false)));
        assert_eq!(bin(BinOp::Or, Value::Null, 2), Ok(Value::Bool(true)));
        assert_eq!(bin(BinOp::Or, 0.0, false), Ok(Value::Bool(false)));
        assert!(matches!(
            bin(BinOp::And, "x", true),
            Err(EvalError::IncompatibleTypes { .. })
        ));
    }

    #[test]
    fn test_logical_rejects_text_on_either_side() {
        for op in [BinOp::And, BinOp::Or] {
            for flag in [false, true] {
                assert!(
                    matches!(bin(op, flag, "x"), Err(EvalError::IncompatibleTypes { .. })),
                    "{op:?} {flag} text"
                );
                assert!(
                    matches!(bin(op, "x", flag), Err(EvalError::IncompatibleTypes { .. })),
                    "{op:?} text {flag}"
                );
            }
        }
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(bin(BinOp::Lt, 1, 1.5), Ok(Value::Bool(true)));
        assert_eq!(bin(BinOp::Ge, "b", "a"), Ok(Value::Bool(true)));
        assert_eq!(bin(BinOp::Eq, f64::NAN, f64::NAN), Ok(Value::Bool(false)));
        assert_eq!(bin(BinOp::Ne, f64::NAN, f64::NAN), Ok(Value::Bool(true)));
        assert_eq!(
            bin(BinOp::Eq, 1, true),
            Err(EvalError::IncompatibleTypes {
                op: "equal_to".to_string(),
                types: "int, bool".to_string(),
            })
        );
    }

    #[test]
    fn test_bitwise_and_text() {
        assert_eq!(bin(BinOp::BitXor, 6, 3), Ok(Value::Int(5)));
        assert_eq!(bin(BinOp::BitAnd, true, false), Ok(Value::Bool(false)));
        assert_eq!(unary(UnaryOp::BitNot, &Value::Int(0)), Ok(Value::Int(-1)));
        assert_eq!(bin(BinOp::Add, "ab", "cd"), Ok(Value::from("abcd")));
        assert!(bin(BinOp::Sub, "ab", "cd").is_err());
        assert!(unary(UnaryOp::Neg, &Value::Bool(true)).is_err());
    }

    #[test]
    fn test_store_admission() {
        let a = Single(Some(1.0));
        let b = Single(Some(2.0));
        assert_eq!(binary(BinOp::Add, &a, &b), Ok(Single(Some(3.0))));
        assert_eq!(
            binary(BinOp::Lt, &a, &b),
            Err(EvalError::IncompatibleTypes {
                op: "less".to_string(),
                types: "double, double".to_string(),
            })
        );
    }
}
