use farmql_core::stmt::{BinaryOp, Expr, ExprBinaryOp};

/// Merges the `=` and `in` operands of an `or` that test the same left side
/// into a single `in`.
///
/// Merged tests come first, in order of their first appearance, followed by
/// the operands that could not be merged. `!=` and `not in` are left alone:
/// their disjunction is not a membership test.
pub fn lift_or_to_in(expr: &mut Expr) -> Option<Expr> {
    let Expr::Or(or) = expr else {
        return None;
    };

    // left side → values it is tested against
    let mut lifted: Vec<(Expr, Vec<Expr>)> = vec![];
    let mut rest = vec![];

    for operand in or.operands.drain(..) {
        match membership(&operand) {
            Some((lhs, values)) => match lifted.iter_mut().find(|(seen, _)| *seen == *lhs) {
                Some((_, existing)) => {
                    for value in values {
                        if !existing.contains(value) {
                            existing.push(value.clone());
                        }
                    }
                }
                None => lifted.push((lhs.clone(), values.to_vec())),
            },
            None => rest.push(operand),
        }
    }

    let mut operands: Vec<Expr> = lifted
        .into_iter()
        .map(|(lhs, mut values)| {
            if values.len() == 1 {
                // `a in [1]` → `a = 1`
                Expr::eq(lhs, values.remove(0))
            } else {
                Expr::in_list(lhs, Expr::list(values))
            }
        })
        .collect();
    operands.extend(rest);

    if operands.len() == 1 {
        operands.pop()
    } else {
        or.operands = operands;
        None
    }
}

/// The left side and tested values of `a = <constant>` or `a in [...]`.
fn membership(expr: &Expr) -> Option<(&Expr, &[Expr])> {
    let Expr::BinaryOp(ExprBinaryOp { lhs, op, rhs }) = expr else {
        return None;
    };

    if lhs.is_const() {
        return None;
    }

    match (op, &**rhs) {
        (BinaryOp::Eq, value) if value.is_const() && !value.is_list() => {
            Some((lhs, std::slice::from_ref(&**rhs)))
        }
        (BinaryOp::In, Expr::List(list)) if list.items.iter().all(Expr::is_const) => {
            Some((lhs, &list.items))
        }
        _ => None,
    }
}
