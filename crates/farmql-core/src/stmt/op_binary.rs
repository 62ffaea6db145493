use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
    In,
    NotIn,
    /// Every item on the right is contained in the list on the left.
    Has,
}

impl BinaryOp {
    pub fn is_eq(self) -> bool {
        matches!(self, Self::Eq)
    }

    pub fn is_ne(self) -> bool {
        matches!(self, Self::Ne)
    }

    pub fn is_in(self) -> bool {
        matches!(self, Self::In)
    }

    /// The operator producing the opposite truth value for every pair of
    /// operands. `has` has no single-operator complement.
    pub fn negate(self) -> Option<BinaryOp> {
        use BinaryOp::*;

        Some(match self {
            Eq => Ne,
            Ne => Eq,
            Lt => Ge,
            Le => Gt,
            Gt => Le,
            Ge => Lt,
            In => NotIn,
            NotIn => In,
            Has => return None,
        })
    }

    /// The operator to use when the operands are swapped.
    pub fn reverse(self) -> Option<BinaryOp> {
        use BinaryOp::*;

        Some(match self {
            Eq => Eq,
            Ne => Ne,
            Lt => Gt,
            Le => Ge,
            Gt => Lt,
            Ge => Le,
            In | NotIn | Has => return None,
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;

        match self {
            Eq => "=".fmt(f),
            Ne => "!=".fmt(f),
            Ge => ">=".fmt(f),
            Gt => ">".fmt(f),
            Le => "<=".fmt(f),
            Lt => "<".fmt(f),
            In => "in".fmt(f),
            NotIn => "not in".fmt(f),
            Has => "has".fmt(f),
        }
    }
}

impl fmt::Debug for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
