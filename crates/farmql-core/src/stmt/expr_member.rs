use super::Expr;

/// Reads a member from the object being matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExprMember {
    /// Type name of the table owning the member.
    pub table: String,

    /// Member name.
    pub member: String,

    /// True if the member is computed from other members.
    pub is_virtual: bool,
}

impl Expr {
    pub fn member(table: impl Into<String>, member: impl Into<String>) -> Expr {
        ExprMember {
            table: table.into(),
            member: member.into(),
            is_virtual: false,
        }
        .into()
    }

    pub fn virtual_member(table: impl Into<String>, member: impl Into<String>) -> Expr {
        ExprMember {
            table: table.into(),
            member: member.into(),
            is_virtual: true,
        }
        .into()
    }

    pub fn is_member(&self) -> bool {
        matches!(self, Expr::Member(_))
    }
}

impl From<ExprMember> for Expr {
    fn from(value: ExprMember) -> Self {
        Expr::Member(value)
    }
}
