use proptest::prelude::*;
use reckon_eval::{ops, BinOp, Value};
use reckon_soundness::{build, depends_on, shape, VAR_NAMES};

/// One context change: variable index and new value (`None` binds null).
fn assignment() -> impl Strategy<Value = (usize, Option<i64>)> {
    (0..VAR_NAMES.len(), prop::option::of(-5i64..5))
}

fn value(v: Option<i64>) -> Value {
    v.map_or(Value::Null, Value::Int)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        .. ProptestConfig::default()
    })]

    #[test]
    fn cached_matches_uncached(
        s in shape(),
        steps in prop::collection::vec(assignment(), 0..12),
    ) {
        let expr = build(&s).expect("build");
        let mut cached = expr.context::<Value>(true);
        let mut uncached = expr.context::<Value>(false);
        prop_assert_eq!(expr.evaluate(&mut cached), expr.evaluate(&mut uncached));

        for (var, v) in steps {
            let Ok(slot) = cached.slot(VAR_NAMES[var]) else {
                continue;
            };
            cached.assign(slot, value(v)).expect("assign");
            uncached.assign(slot, value(v)).expect("assign");

            let mut fresh = expr.context::<Value>(true);
            for sub in uncached.substitutions() {
                if let Some(bound) = sub.value() {
                    fresh.assign_by_name(sub.name(), bound.clone()).expect("assign");
                }
            }

            let result = expr.evaluate(&mut cached);
            prop_assert_eq!(&result, &expr.evaluate(&mut uncached));
            prop_assert_eq!(&result, &expr.evaluate(&mut fresh));
        }
    }

    #[test]
    fn assignment_invalidates_exactly_dependents(
        s in shape(),
        var in 0..VAR_NAMES.len(),
        v in -5i64..5,
    ) {
        let expr = build(&s).expect("build");
        let mut ctx = expr.context::<Value>(true);
        for (slot, _) in expr.variables().enumerate() {
            ctx.assign(slot, 1i64).expect("assign");
        }
        let _ = expr.evaluate(&mut ctx);

        let Some((node, _)) = expr.variables().find(|(_, name)| *name == VAR_NAMES[var]) else {
            return Ok(());
        };
        let before: Vec<bool> = (0..expr.ops().len()).map(|id| ctx.is_cached(id)).collect();
        let slot = ctx.slot(VAR_NAMES[var]).expect("slot");
        ctx.assign(slot, v).expect("assign");

        for (id, was_cached) in before.into_iter().enumerate() {
            let expected = was_cached && !depends_on(expr.ops(), id, node);
            prop_assert_eq!(ctx.is_cached(id), expected, "node #{}", id);
        }
    }

    #[test]
    fn null_absorbs_arithmetic(n in any::<i64>()) {
        let absorbing = [
            BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::Div, BinOp::Mod,
            BinOp::BitAnd, BinOp::BitOr, BinOp::BitXor,
        ];
        for op in absorbing {
            prop_assert_eq!(ops::binary(op, &Value::Null, &Value::Int(n)), Ok(Value::Null));
            prop_assert_eq!(ops::binary(op, &Value::Int(n), &Value::Null), Ok(Value::Null));
            prop_assert_eq!(ops::binary(op, &Value::Null, &Value::Null), Ok(Value::Null));
        }
    }
}
