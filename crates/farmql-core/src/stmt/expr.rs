use super::*;

/// A node in the predicate AST.
///
/// Nodes are plain values. Rewrites build new nodes instead of mutating
/// shared ones; see [`transform`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A value that does not depend on the input object.
    Value(Value),

    /// Absolute time in seconds since the epoch.
    TimeInt(i64),

    /// Seconds relative to the time of evaluation. Negative values point to
    /// the past.
    RelativeTime(i64),

    /// Reads a member of the input object.
    Member(ExprMember),

    List(ExprList),

    Not(ExprNot),

    And(ExprAnd),

    Or(ExprOr),

    BinaryOp(ExprBinaryOp),

    Like(ExprLike),
}

impl Expr {
    pub fn null() -> Expr {
        Expr::Value(Value::Null)
    }

    pub fn value(value: impl Into<Value>) -> Expr {
        Expr::Value(value.into())
    }

    pub fn time_int(secs: i64) -> Expr {
        Expr::TimeInt(secs)
    }

    pub fn relative_time(secs: i64) -> Expr {
        Expr::RelativeTime(secs)
    }

    /// Returns true if the expression is the constant `true`.
    pub fn is_true(&self) -> bool {
        matches!(self, Expr::Value(Value::Bool(true)))
    }

    /// Returns true if the expression is the constant `false`.
    pub fn is_false(&self) -> bool {
        matches!(self, Expr::Value(Value::Bool(false)))
    }

    /// Returns true if the expression evaluates to the same value for every
    /// input object.
    pub fn is_const(&self) -> bool {
        match self {
            Expr::Value(_) | Expr::TimeInt(_) => true,
            Expr::List(list) => list.items.iter().all(Expr::is_const),
            _ => false,
        }
    }

    /// Returns the value of a constant expression.
    pub fn as_const(&self) -> Option<Value> {
        match self {
            Expr::Value(value) => Some(value.clone()),
            Expr::TimeInt(secs) => Some(Value::I64(*secs)),
            Expr::List(list) => list
                .items
                .iter()
                .map(Expr::as_const)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            _ => None,
        }
    }

    pub fn as_member(&self) -> Option<&ExprMember> {
        match self {
            Expr::Member(member) => Some(member),
            _ => None,
        }
    }

    /// Mutable references to the direct children of this node.
    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Value(_) | Expr::TimeInt(_) | Expr::RelativeTime(_) | Expr::Member(_) => vec![],
            Expr::List(list) => list.items.iter_mut().collect(),
            Expr::Not(not) => vec![&mut *not.expr],
            Expr::And(and) => and.operands.iter_mut().collect(),
            Expr::Or(or) => or.operands.iter_mut().collect(),
            Expr::BinaryOp(op) => vec![&mut *op.lhs, &mut *op.rhs],
            Expr::Like(like) => vec![&mut *like.lhs, &mut *like.rhs],
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Value(value)
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Value(Value::Bool(value))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::Value(Value::I64(value))
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::Value(Value::I64(value as i64))
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Value(Value::F64(value))
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::Value(Value::from(value))
    }
}
