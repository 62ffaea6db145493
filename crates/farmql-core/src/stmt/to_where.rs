use super::{BinaryOp, Expr, Value};

use chrono::{Local, TimeZone};
use std::fmt::{self, Write};

impl Expr {
    /// Renders the expression as WHERE text that parses back into an
    /// equivalent expression.
    pub fn to_where(&self) -> String {
        self.to_string()
    }

    /// Renders the expression as an s-expression, handy for debugging and
    /// for asserting on tree shape.
    pub fn to_sexp(&self) -> String {
        let mut dst = String::new();
        write_sexp(self, &mut dst);
        dst
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Value(value) => write_literal(value, f),
            Expr::TimeInt(secs) => match Local.timestamp_opt(*secs, 0).earliest() {
                Some(t) => write!(f, "{}", t.format("%m/%d/%Y|%H:%M:%S")),
                None => write!(f, "{secs}"),
            },
            Expr::RelativeTime(secs) => write!(f, "{secs}s"),
            Expr::Member(member) => f.write_str(&member.member),
            Expr::List(list) => {
                f.write_str("[")?;
                let mut s = "";
                for item in &list.items {
                    write!(f, "{s}{item}")?;
                    s = ", ";
                }
                f.write_str("]")
            }
            Expr::Not(not) => match &*not.expr {
                inner @ (Expr::And(_) | Expr::Or(_)) => write!(f, "not ({inner})"),
                inner => write!(f, "not {inner}"),
            },
            Expr::And(and) => {
                let mut s = "";
                for operand in and {
                    match operand {
                        Expr::Or(_) => write!(f, "{s}({operand})")?,
                        _ => write!(f, "{s}{operand}")?,
                    }
                    s = " and ";
                }
                Ok(())
            }
            Expr::Or(or) => {
                let mut s = "";
                for operand in or {
                    write!(f, "{s}{operand}")?;
                    s = " or ";
                }
                Ok(())
            }
            Expr::BinaryOp(expr) => match expr.op {
                BinaryOp::Eq | BinaryOp::Ne => write!(f, "{}{}{}", expr.lhs, expr.op, expr.rhs),
                op => write!(f, "{} {} {}", expr.lhs, op, expr.rhs),
            },
            Expr::Like(like) => {
                let op = if like.negate { "not like" } else { "like" };
                write!(f, "{} {} {}", like.lhs, op, like.rhs)
            }
        }
    }
}

fn write_literal(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Bool(true) => f.write_str("1=1"),
        Value::Bool(false) => f.write_str("0=1"),
        Value::String(s) => write_quoted(s, f),
        Value::List(items) => {
            f.write_str("[")?;
            let mut s = "";
            for item in items {
                f.write_str(s)?;
                write_literal(item, f)?;
                s = ", ";
            }
            f.write_str("]")
        }
        Value::Json(json) => write_quoted(&json.to_string(), f),
        Value::Timestamp(ts) => write!(f, "{}", ts.format("%m/%d/%Y|%H:%M:%S")),
        other => write!(f, "{other}"),
    }
}

fn write_quoted(s: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_char('\'')?;
    for c in s.chars() {
        match c {
            '\'' | '\\' => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c => f.write_char(c)?,
        }
    }
    f.write_char('\'')
}

fn write_sexp(expr: &Expr, dst: &mut String) {
    match expr {
        Expr::List(l) => write_sexp_list("list", l.items.iter(), dst),
        Expr::Not(n) => write_sexp_list("not", [&*n.expr], dst),
        Expr::And(a) => write_sexp_list("and", a.operands.iter(), dst),
        Expr::Or(o) => write_sexp_list("or", o.operands.iter(), dst),
        Expr::BinaryOp(b) => write_sexp_list(&b.op.to_string(), [&*b.lhs, &*b.rhs], dst),
        Expr::Like(l) => write_sexp_list(
            if l.negate { "not like" } else { "like" },
            [&*l.lhs, &*l.rhs],
            dst,
        ),
        Expr::Member(m) => {
            let _ = write!(dst, "{}.{}", m.table, m.member);
        }
        other => {
            let _ = write!(dst, "{other}");
        }
    }
}

fn write_sexp_list<'a>(name: &str, items: impl IntoIterator<Item = &'a Expr>, dst: &mut String) {
    dst.push('(');
    dst.push_str(name);
    for item in items {
        dst.push(' ');
        write_sexp(item, dst);
    }
    dst.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn comparison_spacing() {
        let expr = Expr::and(
            Expr::ne(Expr::member("T", "a"), 1),
            Expr::ne(Expr::member("T", "a"), 2),
        );
        assert_eq!(expr.to_where(), "a!=1 and a!=2");

        let expr = Expr::ge(Expr::member("Job", "priority"), Value::F64(300.0));
        assert_eq!(expr.to_where(), "priority >= 300.0");
    }

    #[test]
    fn nested_or_inside_and_is_parenthesized() {
        let expr = Expr::and(
            Expr::member("Job", "active"),
            Expr::or(Expr::member("Job", "error"), Expr::member("Job", "done")),
        );
        assert_eq!(expr.to_where(), "active and (error or done)");
        assert_eq!(
            Expr::not(expr).to_where(),
            "not (active and (error or done))"
        );
    }

    #[test]
    fn strings_are_quoted_and_escaped() {
        let expr = Expr::in_list(Expr::member("Job", "user"), Expr::list(["tom", "o'neil"]));
        assert_eq!(expr.to_where(), r"user in ['tom', 'o\'neil']");

        let expr = Expr::not_like(Expr::member("Job", "title"), "^x");
        assert_eq!(expr.to_where(), "title not like '^x'");
    }

    #[test]
    fn sexp_shape() {
        let expr = Expr::in_list(Expr::member("Job", "owner"), Expr::list(["tom", "dick"]));
        assert_eq!(expr.to_sexp(), "(in Job.owner (list 'tom' 'dick'))");
    }
}
