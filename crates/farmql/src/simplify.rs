mod dead_code;
pub use dead_code::dead_code;

mod flatten;
pub use flatten::flatten;

mod fold_constant;
pub use fold_constant::fold_constant;

mod fold_not;
pub use fold_not::fold_not;

mod lift_or_to_in;
pub use lift_or_to_in::lift_or_to_in;

use crate::{Error, Result};

use farmql_core::stmt::{self, transform, Expr, ExprMember, Input, Value};

/// Rewrites a predicate into an equivalent, cheaper one.
///
/// Negations are pushed down to the leaves first so that the remaining
/// passes see plain comparisons. Patterns of `like` expressions with a
/// constant right side are compiled once at the end.
pub fn optimize(expr: Expr) -> Result<Expr> {
    let expr = transform(expr, &[fold_not]);
    let mut expr = transform(expr, &[fold_constant, flatten, dead_code, lift_or_to_in]);
    compile_patterns(&mut expr)?;
    Ok(expr)
}

fn compile_patterns(expr: &mut Expr) -> Result<()> {
    if let Expr::Like(like) = expr {
        if !like.is_compiled() {
            if let Some(compiled) = like.compile() {
                *like = compiled?;
            }
        }
    }

    for child in expr.children_mut() {
        compile_patterns(child)?;
    }

    Ok(())
}

/// Evaluates an expression that reads no member.
fn eval_const(expr: &Expr) -> Option<Value> {
    struct NoMembers;

    impl Input for NoMembers {
        fn member(&mut self, member: &ExprMember) -> Result<Value> {
            Err(Error::evaluation(format!(
                "constant expression reads '{}'",
                member.member
            )))
        }
    }

    stmt::evaluate(expr, &mut NoMembers).ok()
}
