use super::Expr;

use std::mem;

/// A rewrite pass. Returns the replacement for the given node, or `None` to
/// keep it.
pub type Pass = fn(&mut Expr) -> Option<Expr>;

/// Rewrites `expr` bottom-up.
///
/// Children are transformed first and placed back into their parent, then
/// every pass runs in order on the rebuilt node, each seeing the result of
/// the previous one.
pub fn transform(mut expr: Expr, passes: &[Pass]) -> Expr {
    for child in expr.children_mut() {
        let node = mem::replace(child, Expr::null());
        *child = transform(node, passes);
    }

    for pass in passes {
        if let Some(replacement) = pass(&mut expr) {
            expr = replacement;
        }
    }

    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::{BinaryOp, Value};

    fn swap_eq_for_ne(expr: &mut Expr) -> Option<Expr> {
        match expr {
            Expr::BinaryOp(op) if op.op == BinaryOp::Eq => {
                Some(Expr::ne((*op.lhs).clone(), (*op.rhs).clone()))
            }
            _ => None,
        }
    }

    fn count_as_true(expr: &mut Expr) -> Option<Expr> {
        match expr {
            Expr::BinaryOp(op) if op.op == BinaryOp::Ne => Some(true.into()),
            _ => None,
        }
    }

    #[test]
    fn passes_run_bottom_up_and_in_order() {
        // `and(a = 1, not(b = 2))` → `and(true, not(true))`
        let expr = Expr::and(
            Expr::eq(Expr::member("T", "a"), 1),
            Expr::not(Expr::eq(Expr::member("T", "b"), 2)),
        );

        let result = transform(expr, &[swap_eq_for_ne, count_as_true]);

        assert_eq!(
            result,
            Expr::and(Expr::Value(Value::Bool(true)), Expr::not(true))
        );
    }

    #[test]
    fn untouched_tree_is_equal() {
        let expr = Expr::or(Expr::member("T", "a"), Expr::list([1i64, 2]));
        assert_eq!(transform(expr.clone(), &[]), expr);
    }
}
