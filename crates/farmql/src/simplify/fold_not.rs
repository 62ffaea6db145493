use farmql_core::stmt::{Expr, Value};

use std::mem;

/// Pushes `not` down to the leaves of the tree.
///
/// Negations that have no single-operator complement, such as `not (a has
/// b)`, are kept.
pub fn fold_not(expr: &mut Expr) -> Option<Expr> {
    let Expr::Not(not) = expr else {
        return None;
    };

    Some(negate(mem::replace(&mut *not.expr, Expr::null())))
}

fn negate(expr: Expr) -> Expr {
    match expr {
        // `not (not x)` → `x`
        Expr::Not(not) => *not.expr,

        // `not <constant>` → `true` or `false`
        expr if expr.is_const() => match expr.as_const() {
            Some(value) => Expr::Value(Value::Bool(!value.is_truthy())),
            None => Expr::not(expr),
        },

        // `not (a < b)` → `a >= b`, `not (a in l)` → `a not in l`, ...
        Expr::BinaryOp(mut op) => match op.op.negate() {
            Some(negated) => {
                op.op = negated;
                Expr::BinaryOp(op)
            }
            None => Expr::not(Expr::BinaryOp(op)),
        },

        // `not (a like p)` → `a not like p`
        Expr::Like(like) => like.negated().into(),

        // `not (a and b)` → `not a or not b`
        Expr::And(and) => Expr::or_from_vec(and.operands.into_iter().map(negate).collect()),

        // `not (a or b)` → `not a and not b`
        Expr::Or(or) => Expr::and_from_vec(or.operands.into_iter().map(negate).collect()),

        expr => Expr::not(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmql_core::stmt::transform;

    fn member(name: &str) -> Expr {
        Expr::member("Job", name)
    }

    fn fold(expr: Expr) -> Expr {
        transform(expr, &[fold_not])
    }

    #[test]
    fn double_negation() {
        // `not not a` → `a`
        assert_eq!(fold(Expr::not(Expr::not(member("a")))), member("a"));
    }

    #[test]
    fn comparisons_invert() {
        // `not a < 1` → `a >= 1`
        assert_eq!(fold(Expr::not(Expr::lt(member("a"), 1))), Expr::ge(member("a"), 1));
        // `not a = 1` → `a != 1`
        assert_eq!(fold(Expr::not(Expr::eq(member("a"), 1))), Expr::ne(member("a"), 1));
        // `not a in [1]` → `a not in [1]`
        assert_eq!(
            fold(Expr::not(Expr::in_list(member("a"), Expr::list([1])))),
            Expr::not_in_list(member("a"), Expr::list([1]))
        );
    }

    #[test]
    fn like_inverts() {
        // `not a like x` → `a not like x`
        assert_eq!(
            fold(Expr::not(Expr::like(member("a"), "x"))),
            Expr::not_like(member("a"), "x")
        );
    }

    #[test]
    fn de_morgan() {
        // `not (a = 1 or b = 2)` → `a != 1 and b != 2`
        assert_eq!(
            fold(Expr::not(Expr::or(Expr::eq(member("a"), 1), Expr::eq(member("b"), 2)))),
            Expr::and(Expr::ne(member("a"), 1), Expr::ne(member("b"), 2))
        );

        // `not (a and not b)` → `not a or b`
        assert_eq!(
            fold(Expr::not(Expr::and(member("a"), Expr::not(member("b"))))),
            Expr::or(Expr::not(member("a")), member("b"))
        );
    }

    #[test]
    fn constants_are_evaluated() {
        // `not true` → `false`
        assert_eq!(fold(Expr::not(true)), Expr::from(false));
        // `not 0` → `true`
        assert_eq!(fold(Expr::not(0)), Expr::from(true));
    }

    #[test]
    fn has_is_kept() {
        let expr = Expr::not(Expr::has(member("crews"), Expr::list(["fx"])));
        assert_eq!(fold(expr.clone()), expr);
    }
}
