use farmql_core::stmt::Expr;

use std::mem;

/// Merges nested `and`s into their parent `and`, and nested `or`s into
/// their parent `or`.
pub fn flatten(expr: &mut Expr) -> Option<Expr> {
    match expr {
        // `and(a, and(b, c))` → `and(a, b, c)`
        Expr::And(and) if and.operands.iter().any(Expr::is_and) => {
            let operands = mem::take(&mut and.operands)
                .into_iter()
                .flat_map(|operand| match operand {
                    Expr::And(nested) => nested.operands,
                    operand => vec![operand],
                })
                .collect();
            Some(Expr::and_from_vec(operands))
        }
        // `or(a, or(b, c))` → `or(a, b, c)`
        Expr::Or(or) if or.operands.iter().any(Expr::is_or) => {
            let operands = mem::take(&mut or.operands)
                .into_iter()
                .flat_map(|operand| match operand {
                    Expr::Or(nested) => nested.operands,
                    operand => vec![operand],
                })
                .collect();
            Some(Expr::or_from_vec(operands))
        }
        _ => None,
    }
}
