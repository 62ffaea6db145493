use super::{Expr, Value};
use crate::Result;

use regex::Regex;
use std::sync::Arc;

/// Regular expression match of the left operand against one or more
/// patterns on the right. Matches if any pattern is found anywhere in the
/// text of the left operand.
#[derive(Debug, Clone)]
pub struct ExprLike {
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,

    /// When set, the expression matches only if no pattern is found.
    pub negate: bool,

    /// Patterns compiled once when the right operand is constant.
    compiled: Option<Arc<[Regex]>>,
}

impl ExprLike {
    pub fn new(lhs: Expr, rhs: Expr, negate: bool) -> ExprLike {
        ExprLike {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            negate,
            compiled: None,
        }
    }

    /// Compiles the constant right operand. Returns `None` when the right
    /// operand depends on the input object.
    pub fn compile(&self) -> Option<Result<ExprLike>> {
        let patterns = self.rhs.as_const()?;
        let compiled = patterns_of(&patterns)
            .into_iter()
            .map(|pattern| Regex::new(&pattern).map_err(Into::into))
            .collect::<Result<Vec<_>>>();

        Some(compiled.map(|compiled| ExprLike {
            lhs: self.lhs.clone(),
            rhs: self.rhs.clone(),
            negate: self.negate,
            compiled: Some(compiled.into()),
        }))
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    pub fn compiled(&self) -> Option<&[Regex]> {
        self.compiled.as_deref()
    }

    /// Returns the same expression with the opposite sense.
    pub fn negated(self) -> ExprLike {
        ExprLike {
            negate: !self.negate,
            ..self
        }
    }
}

/// Flattens a pattern operand into the list of pattern strings.
pub(crate) fn patterns_of(value: &Value) -> Vec<String> {
    match value {
        Value::List(items) => items.iter().map(Value::to_text).collect(),
        other => vec![other.to_text()],
    }
}

impl PartialEq for ExprLike {
    fn eq(&self, other: &ExprLike) -> bool {
        self.negate == other.negate && self.lhs == other.lhs && self.rhs == other.rhs
    }
}

impl Expr {
    pub fn like(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        ExprLike::new(lhs.into(), rhs.into(), false).into()
    }

    pub fn not_like(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        ExprLike::new(lhs.into(), rhs.into(), true).into()
    }

    pub fn is_like(&self) -> bool {
        matches!(self, Expr::Like(_))
    }
}

impl From<ExprLike> for Expr {
    fn from(value: ExprLike) -> Self {
        Expr::Like(value)
    }
}
