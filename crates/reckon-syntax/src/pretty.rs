//! Pretty printer producing canonical reckon source text.
//!
//! Shared subexpressions are printed at every use, so the text of a DAG can be
//! exponentially larger than its operation list. [`print_bounded`] refuses
//! such expressions up front.

use crate::lexer::escape;
use reckon_eval::{Expression, Node, OpId, Operand, Store};
use std::fmt::Write;

/// Print an expression in the reckon grammar.
pub fn print<S: Store>(expr: &Expression<S>) -> String {
    let mut printer = Printer::new(expr.ops(), expr.consts());
    printer.print(expr.root());
    printer.output
}

/// Print an expression unless its text would exceed `limit` bytes.
///
/// The length is worked out from the operation list first, so a small DAG
/// whose text would be huge is refused without being expanded.
pub fn print_bounded<S: Store>(expr: &Expression<S>, limit: usize) -> Option<String> {
    (printed_len(expr) <= limit).then(|| print(expr))
}

/// Length in bytes of [`print`]'s output, saturating at `usize::MAX`.
pub fn printed_len<S: Store>(expr: &Expression<S>) -> usize {
    let ops = expr.ops();
    let mut lens: Vec<usize> = Vec::with_capacity(ops.len());
    for node in ops {
        let len = match node {
            Node::Const { slot } => expr
                .consts()
                .get(*slot)
                .map_or("null".len(), |value| print_value(value).len()),
            Node::Var { name, .. } => escape(name).len() + "${}".len(),
            Node::Unary { op, arg } => lens[*arg].saturating_add(op.sign().len() + 2),
            Node::Binary { op, lhs, rhs } => lens[*lhs]
                .saturating_add(lens[*rhs])
                .saturating_add(op.sign().len() + 4),
            Node::Ternary {
                cond,
                then,
                otherwise,
            } => lens[*cond]
                .saturating_add(lens[*then])
                .saturating_add(lens[*otherwise])
                .saturating_add("if(, , )".len()),
            Node::Extension { name, args, .. } => args.iter().fold(
                name.len() + "@()".len() + 2 * args.len().saturating_sub(1),
                |len, arg| len.saturating_add(lens[*arg]),
            ),
        };
        lens.push(len);
    }
    lens.last().copied().unwrap_or(0)
}

/// Print a single store value as a typed constant or `null`.
pub fn print_value<S: Store>(value: &S) -> String {
    let mut output = String::new();
    write_operand(&mut output, value.operand());
    output
}

fn write_operand(output: &mut String, operand: Operand<'_>) {
    // Writing into a String cannot fail.
    let _ = match operand {
        Operand::Null => write!(output, "null"),
        Operand::Bool(b) => write!(output, "bool{{{b}}}"),
        Operand::Int(n) => write!(output, "int{{{n}}}"),
        Operand::Float(x) => write!(output, "double{{{x}}}"),
        Operand::Text(text) => write!(output, "text{{{}}}", escape(text)),
    };
}

/// Pending printer output: a node still to expand or literal text.
enum Item<'a> {
    Node(OpId),
    Text(&'a str),
}

struct Printer<'a, S> {
    ops: &'a [Node],
    consts: &'a [S],
    output: String,
}

impl<'a, S: Store> Printer<'a, S> {
    fn new(ops: &'a [Node], consts: &'a [S]) -> Self {
        Self {
            ops,
            consts,
            output: String::new(),
        }
    }

    /// Print node `root` with an explicit stack; items are pushed in reverse.
    fn print(&mut self, root: OpId) {
        let mut stack = vec![Item::Node(root)];
        while let Some(item) = stack.pop() {
            let id = match item {
                Item::Text(text) => {
                    self.output.push_str(text);
                    continue;
                }
                Item::Node(id) => id,
            };
            let ops = self.ops;
            match &ops[id] {
                Node::Const { slot } => match self.consts.get(*slot) {
                    Some(value) => write_operand(&mut self.output, value.operand()),
                    None => self.output.push_str("null"),
                },
                Node::Var { name, .. } => {
                    self.output.push_str("${");
                    self.output.push_str(&escape(name));
                    self.output.push('}');
                }
                Node::Unary { op, arg } => {
                    self.output.push('(');
                    self.output.push_str(op.sign());
                    stack.extend([Item::Text(")"), Item::Node(*arg)]);
                }
                Node::Binary { op, lhs, rhs } => {
                    self.output.push('(');
                    stack.extend([
                        Item::Text(")"),
                        Item::Node(*rhs),
                        Item::Text(" "),
                        Item::Text(op.sign()),
                        Item::Text(" "),
                        Item::Node(*lhs),
                    ]);
                }
                Node::Ternary {
                    cond,
                    then,
                    otherwise,
                } => {
                    self.output.push_str("if(");
                    stack.extend([
                        Item::Text(")"),
                        Item::Node(*otherwise),
                        Item::Text(", "),
                        Item::Node(*then),
                        Item::Text(", "),
                        Item::Node(*cond),
                    ]);
                }
                Node::Extension { name, args, .. } => {
                    self.output.push('@');
                    self.output.push_str(name);
                    self.output.push('(');
                    stack.push(Item::Text(")"));
                    for (i, arg) in args.iter().enumerate().rev() {
                        stack.push(Item::Node(*arg));
                        if i > 0 {
                            stack.push(Item::Text(", "));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, parse_value};
    use reckon_eval::{BinOp, Builder, UnaryOp, Value};

    fn roundtrip(source: &str) -> String {
        let expr: Expression<Value> = parse(source).unwrap();
        print(&expr)
    }

    #[test]
    fn test_print_built_expression() {
        let mut b: Builder<Value> = Builder::new();
        let a = b.var("a").unwrap();
        let c = b.constant(42i64).unwrap();
        let sum = b.binary(BinOp::Add, a, c).unwrap();
        let neg = b.unary(UnaryOp::Neg, sum).unwrap();
        let cond = b.constant(true).unwrap();
        let text = b.constant("x{y}").unwrap();
        b.branch(cond, neg, text).unwrap();
        let expr = b.build().unwrap();

        assert_eq!(
            print(&expr),
            "if(bool{true}, (-(${a} + int{42})), text{x\\{y\\}})"
        );
    }

    #[test]
    fn test_canonical_text() {
        assert_eq!(roundtrip("( ${a}+int{ 1 } )"), "(${a} + int{1})");
        assert_eq!(roundtrip("@avail( null ,${b})"), "@avail(null, ${b})");
        assert_eq!(roundtrip("(double{1.50} * double{-0})"), "(double{1.5} * double{-0})");
        assert_eq!(roundtrip("@avail()"), "@avail()");
    }

    #[test]
    fn test_print_is_stable() {
        let sources = [
            "if((${a} >= int{0}), (${a} % int{7}), null)",
            "((${x} + ${y}) - (${x} + ${y}))",
            "(~(${a\\}} ^ int{3}))",
            "((text{a} + text{\\\\}) == text{a\\\\})",
        ];
        for source in sources {
            let printed = roundtrip(source);
            assert_eq!(roundtrip(&printed), printed, "source: {source}");
        }
    }

    #[test]
    fn test_printed_len_matches_output() {
        let sources = [
            "if((${a} >= int{0}), (${a} % int{7}), null)",
            "@avail(null, ${b\\}}, (-text{x\\}}))",
            "@avail()",
            "(bool{false} || (~double{2.5}))",
        ];
        for source in sources {
            let expr: Expression<Value> = parse(source).unwrap();
            assert_eq!(printed_len(&expr), print(&expr).len(), "source: {source}");
        }
    }

    #[test]
    fn test_deep_chain_prints() {
        let mut b: Builder<Value> = Builder::new();
        let mut top = b.var("a").unwrap();
        for i in 0..100_000 {
            let op = if i % 2 == 0 { UnaryOp::Neg } else { UnaryOp::BitNot };
            top = b.unary(op, top).unwrap();
        }
        let expr = b.build().unwrap();

        let printed = print(&expr);
        assert_eq!(printed.len(), printed_len(&expr));
        assert!(printed.starts_with("(~(-(~(-"));
        assert!(printed.ends_with("(-${a}))))"));
    }

    #[test]
    fn test_shared_doubling_is_refused() {
        // x1 = a + a, x2 = x1 + x1, ... prints as 2^40 copies of ${a}.
        let mut b: Builder<Value> = Builder::new();
        let mut top = b.var("a").unwrap();
        for _ in 0..40 {
            top = b.binary(BinOp::Add, top, top).unwrap();
        }
        let expr = b.build().unwrap();

        assert!(printed_len(&expr) > 1 << 40);
        assert_eq!(print_bounded(&expr, 1 << 20), None);

        let small: Expression<Value> = parse("(${a} + ${a})").unwrap();
        assert_eq!(
            print_bounded(&small, 13).as_deref(),
            Some("(${a} + ${a})")
        );
        assert_eq!(print_bounded(&small, 12), None);
    }

    #[test]
    fn test_print_value() {
        assert_eq!(print_value(&Value::Null), "null");
        assert_eq!(print_value(&Value::Int(-3)), "int{-3}");
        assert_eq!(print_value(&Value::Float(0.25)), "double{0.25}");
        let text = Value::Text("}".to_string());
        assert_eq!(parse_value::<Value>(&print_value(&text)), Ok(text));
    }
}
