use super::expr_like::patterns_of;
use super::*;
use crate::{Error, Result};

use indexmap::IndexMap;
use regex::Regex;

/// Supplies member values to the predicate interpreter.
pub trait Input {
    /// Returns the current value of `member`.
    fn member(&mut self, member: &ExprMember) -> Result<Value>;

    /// Current time in seconds since the epoch. Relative times are resolved
    /// against it.
    fn now(&self) -> i64 {
        chrono::Local::now().timestamp()
    }
}

/// Evaluates `expr` against `input`.
pub fn evaluate(expr: &Expr, input: &mut dyn Input) -> Result<Value> {
    Ok(match expr {
        Expr::Value(value) => value.clone(),
        Expr::TimeInt(secs) => Value::I64(*secs),
        Expr::RelativeTime(secs) => Value::I64(input.now() + secs),
        Expr::Member(member) => input.member(member)?,
        Expr::List(list) => Value::List(
            list.items
                .iter()
                .map(|item| evaluate(item, input))
                .collect::<Result<_>>()?,
        ),
        Expr::Not(not) => Value::Bool(!evaluate(&not.expr, input)?.is_truthy()),
        Expr::And(and) => {
            for operand in and {
                if !evaluate(operand, input)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
            }
            Value::Bool(true)
        }
        Expr::Or(or) => {
            for operand in or {
                if evaluate(operand, input)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
            }
            Value::Bool(false)
        }
        Expr::BinaryOp(expr) => {
            let lhs = evaluate(&expr.lhs, input)?;
            let rhs = evaluate(&expr.rhs, input)?;
            Value::Bool(eval_binary_op(expr.op, &lhs, &rhs))
        }
        Expr::Like(like) => {
            let lhs = evaluate(&like.lhs, input)?;
            let text = lhs.to_text();

            let found = match like.compiled() {
                Some(compiled) => compiled.iter().any(|re| re.is_match(&text)),
                None => {
                    let patterns = evaluate(&like.rhs, input)?;
                    let mut found = false;
                    for pattern in patterns_of(&patterns) {
                        let re = Regex::new(&pattern).map_err(|err| {
                            Error::evaluation(format!("invalid pattern '{pattern}': {err}"))
                        })?;
                        if re.is_match(&text) {
                            found = true;
                            break;
                        }
                    }
                    found
                }
            };

            Value::Bool(found != like.negate)
        }
    })
}

/// Evaluates `expr` and reports whether the result is truthy.
pub fn matches(expr: &Expr, input: &mut dyn Input) -> Result<bool> {
    Ok(evaluate(expr, input)?.is_truthy())
}

pub(crate) fn eval_binary_op(op: BinaryOp, lhs: &Value, rhs: &Value) -> bool {
    use std::cmp::Ordering::*;

    match op {
        BinaryOp::Eq => lhs == rhs,
        BinaryOp::Ne => lhs != rhs,
        BinaryOp::Lt => lhs.cmp_total(rhs) == Less,
        BinaryOp::Le => lhs.cmp_total(rhs) != Greater,
        BinaryOp::Gt => lhs.cmp_total(rhs) == Greater,
        BinaryOp::Ge => lhs.cmp_total(rhs) != Less,
        BinaryOp::In => contains(rhs, lhs),
        BinaryOp::NotIn => !contains(rhs, lhs),
        BinaryOp::Has => match rhs {
            Value::List(items) => items.iter().all(|item| contains(lhs, item)),
            item => contains(lhs, item),
        },
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::List(items) => items.iter().any(|item| item == needle),
        other => other == needle,
    }
}

/// Plain maps of member name to value can be matched directly.
impl Input for IndexMap<String, Value> {
    fn member(&mut self, member: &ExprMember) -> Result<Value> {
        Ok(self
            .get(&member.member)
            .or_else(|| self.get(&format!("{}.{}", member.table, member.member)))
            .cloned()
            .unwrap_or(Value::Null))
    }
}
