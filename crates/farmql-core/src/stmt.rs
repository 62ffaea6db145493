mod eval;
pub use eval::{evaluate, matches, Input};

mod expr;
pub use expr::Expr;

mod expr_and;
pub use expr_and::ExprAnd;

mod expr_binary_op;
pub use expr_binary_op::ExprBinaryOp;

mod expr_like;
pub use expr_like::ExprLike;

mod expr_list;
pub use expr_list::ExprList;

mod expr_member;
pub use expr_member::ExprMember;

mod expr_not;
pub use expr_not::ExprNot;

mod expr_or;
pub use expr_or::ExprOr;

mod op_binary;
pub use op_binary::BinaryOp;

mod to_where;

mod transform;
pub use transform::{transform, Pass};

mod value;
pub use value::Value;

mod value_cmp;
