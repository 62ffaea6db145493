use super::eval_const;

use farmql_core::stmt::{Expr, Value};

/// Evaluates everything that does not depend on the object being matched.
pub fn fold_constant(expr: &mut Expr) -> Option<Expr> {
    match expr {
        Expr::And(and) => {
            // `and(..., false, ...)` → `false`
            if and.operands.iter().any(|operand| truth(operand) == Some(false)) {
                return Some(false.into());
            }

            // `and(..., true, ...)` → `and(..., ...)`
            and.operands.retain(|operand| truth(operand) != Some(true));

            match and.operands.len() {
                // `and()` → `true`
                0 => Some(true.into()),
                // `and(a)` → `a`
                1 => and.operands.pop(),
                _ => None,
            }
        }
        Expr::Or(or) => {
            // `or(..., true, ...)` → `true`
            if or.operands.iter().any(|operand| truth(operand) == Some(true)) {
                return Some(true.into());
            }

            // `or(..., false, ...)` → `or(..., ...)`
            or.operands.retain(|operand| truth(operand) != Some(false));

            match or.operands.len() {
                // `or()` → `false`
                0 => Some(false.into()),
                // `or(a)` → `a`
                1 => or.operands.pop(),
                _ => None,
            }
        }
        // `1 < 2` → `true`
        Expr::BinaryOp(op) if op.lhs.is_const() && op.rhs.is_const() => {
            eval_const(expr).map(Expr::Value)
        }
        // `'abc' like 'b'` → `true`
        Expr::Like(like) if like.lhs.is_const() && like.rhs.is_const() => {
            eval_const(expr).map(Expr::Value)
        }
        // `not true` → `false`
        Expr::Not(not) if not.expr.is_const() => eval_const(expr).map(Expr::Value),
        _ => None,
    }
}

/// Truthiness of a constant operand.
fn truth(expr: &Expr) -> Option<bool> {
    expr.as_const().as_ref().map(Value::is_truthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmql_core::stmt::transform;

    fn member(name: &str) -> Expr {
        Expr::member("Job", name)
    }

    fn fold(expr: Expr) -> Expr {
        transform(expr, &[fold_constant])
    }

    #[test]
    fn and_with_constants() {
        // `and(a, false)` → `false`
        assert_eq!(fold(Expr::and(member("a"), false)), Expr::from(false));
        // `and(a, true)` → `a`
        assert_eq!(fold(Expr::and(member("a"), true)), member("a"));
        // `and()` → `true`
        assert_eq!(fold(Expr::and_from_vec(vec![])), Expr::from(true));
    }

    #[test]
    fn or_with_constants() {
        // `or(a, true)` → `true`
        assert_eq!(fold(Expr::or(member("a"), true)), Expr::from(true));
        // `or(a, false, b)` → `or(a, b)`
        assert_eq!(
            fold(Expr::or_from_vec(vec![member("a"), false.into(), member("b")])),
            Expr::or(member("a"), member("b"))
        );
        // `or()` → `false`
        assert_eq!(fold(Expr::or_from_vec(vec![])), Expr::from(false));
    }

    #[test]
    fn constant_comparisons() {
        // `1 < 2` → `true`
        assert_eq!(fold(Expr::lt(1, 2)), Expr::from(true));
        // `3 in [1, 2]` → `false`
        assert_eq!(fold(Expr::in_list(3, Expr::list([1, 2]))), Expr::from(false));
        // `'shot01' like '^shot'` → `true`
        assert_eq!(fold(Expr::like("shot01", "^shot")), Expr::from(true));
        // `a < 2` stays
        assert_eq!(fold(Expr::lt(member("a"), 2)), Expr::lt(member("a"), 2));
    }

    #[test]
    fn folding_cascades() {
        // `or(a, and(1 = 1, 2 > 1))` → `true`
        let expr = Expr::or(
            member("a"),
            Expr::and(Expr::eq(1, 1), Expr::gt(2, 1)),
        );
        assert_eq!(fold(expr), Expr::from(true));
    }

    #[test]
    fn relative_times_are_not_constant() {
        let expr = Expr::gt(Expr::relative_time(-60), Expr::time_int(0));
        assert_eq!(fold(expr.clone()), expr);
    }
}
