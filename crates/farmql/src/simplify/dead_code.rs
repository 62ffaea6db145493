use farmql_core::stmt::{BinaryOp, Expr};

/// Drops repeated operands of `and`/`or` and repeated values of the lists
/// searched by `in`, `not in`, `like` and `not like`. The first occurrence
/// is kept.
pub fn dead_code(expr: &mut Expr) -> Option<Expr> {
    match expr {
        // `and(a, b, a)` → `and(a, b)`
        Expr::And(and) => {
            dedup(&mut and.operands);
            (and.operands.len() == 1).then(|| and.operands.remove(0))
        }
        // `or(a, b, a)` → `or(a, b)`
        Expr::Or(or) => {
            dedup(&mut or.operands);
            (or.operands.len() == 1).then(|| or.operands.remove(0))
        }
        // `a in [1, 2, 1]` → `a in [1, 2]`
        Expr::BinaryOp(op) if matches!(op.op, BinaryOp::In | BinaryOp::NotIn) => {
            if let Expr::List(list) = &mut *op.rhs {
                dedup(&mut list.items);
            }
            None
        }
        // `a like ['x', 'x']` → `a like ['x']`
        Expr::Like(like) => {
            if let Expr::List(list) = &mut *like.rhs {
                dedup(&mut list.items);
            }
            None
        }
        _ => None,
    }
}

fn dedup(items: &mut Vec<Expr>) {
    let mut seen: Vec<Expr> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmql_core::stmt::transform;

    fn member(name: &str) -> Expr {
        Expr::member("Job", name)
    }

    #[test]
    fn repeated_operands() {
        // `and(a = 1, b, a = 1)` → `and(a = 1, b)`
        let expr = Expr::and_from_vec(vec![Expr::eq(member("a"), 1), member("b"), Expr::eq(member("a"), 1)]);
        assert_eq!(
            transform(expr, &[dead_code]),
            Expr::and(Expr::eq(member("a"), 1), member("b"))
        );

        // `or(a, a)` → `a`
        let expr = Expr::or(member("a"), member("a"));
        assert_eq!(transform(expr, &[dead_code]), member("a"));
    }

    #[test]
    fn repeated_list_values() {
        // `a not in [1, 2, 1, 3, 2]` → `a not in [1, 2, 3]`
        let expr = Expr::not_in_list(member("a"), Expr::list([1, 2, 1, 3, 2]));
        assert_eq!(
            transform(expr, &[dead_code]),
            Expr::not_in_list(member("a"), Expr::list([1, 2, 3]))
        );

        // `a like ['x', 'y', 'x']` → `a like ['x', 'y']`
        let expr = Expr::like(member("a"), Expr::list(["x", "y", "x"]));
        assert_eq!(
            transform(expr, &[dead_code]),
            Expr::like(member("a"), Expr::list(["x", "y"]))
        );
    }
}
