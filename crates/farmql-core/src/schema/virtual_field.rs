use super::Field;
use crate::{stmt::Value, Error, Result};

use std::fmt;

/// Behavior of a field computed from other members.
///
/// `columns` are the qualified storage columns of the dependent members and
/// `dependents` their values, both in the order the dependents were
/// declared.
pub trait VirtualField: fmt::Debug + Send + Sync + 'static {
    /// Computes the member value from the dependent values.
    fn value(&self, dependents: &[Value], now: i64) -> Value;

    /// SQL for the field used on its own, e.g. `where dispatcher`.
    fn where_standalone(&self, _field: &Field, columns: &[String], negate: bool) -> Result<String> {
        let sql = format!("({})", columns.join(" AND "));
        Ok(if negate { format!("NOT {sql}") } else { sql })
    }

    /// SQL for the field compared with a literal. `operand` is the rendered
    /// literal and `field_on_left` tells on which side of `op` the field
    /// appeared.
    fn where_comparison(
        &self,
        field: &Field,
        _columns: &[String],
        _op: &str,
        _operand: &str,
        _field_on_left: bool,
    ) -> Result<String> {
        Err(Error::incorrect_type(format!(
            "the virtual field '{}' cannot be used in a query.",
            field.member
        )))
    }

    /// SQL expression selected for the field, if it can be computed in the
    /// store.
    fn select(&self, _columns: &[String]) -> Option<String> {
        None
    }
}

/// Fills each `{}` of a template with the next dependent value.
#[derive(Debug, Clone)]
pub struct Formatted {
    template: String,
}

impl Formatted {
    pub fn new(template: impl Into<String>) -> Formatted {
        Formatted {
            template: template.into(),
        }
    }
}

impl VirtualField for Formatted {
    fn value(&self, dependents: &[Value], _now: i64) -> Value {
        let mut out = String::new();
        let mut values = dependents.iter();
        let mut rest = self.template.as_str();

        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            if let Some(value) = values.next() {
                out.push_str(&value.to_text());
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);

        Value::String(out)
    }
}

/// Seconds between a start and an end time, where an unset end means "still
/// running". Depends on `[start, end]`.
#[derive(Debug, Clone, Default)]
pub struct ElapsedSecs;

impl ElapsedSecs {
    fn sql(columns: &[String], now: i64) -> Result<String> {
        let [start, end] = columns else {
            return Err(Error::invalid_schema(
                "elapsed seconds need exactly a start and an end member",
            ));
        };
        Ok(format!(
            "(CASE WHEN {start}>0 THEN (CASE WHEN {end}>0 THEN {end} ELSE {now} END)-{start} ELSE 0 END)"
        ))
    }
}

impl VirtualField for ElapsedSecs {
    fn value(&self, dependents: &[Value], now: i64) -> Value {
        let start = dependents.first().and_then(Value::as_i64).unwrap_or(0);
        let end = dependents.get(1).and_then(Value::as_i64).unwrap_or(0);

        if start <= 0 {
            return Value::I64(0);
        }

        let end = if end > 0 { end } else { now };
        Value::I64(end - start)
    }

    fn where_standalone(&self, _field: &Field, columns: &[String], negate: bool) -> Result<String> {
        let start = columns
            .first()
            .ok_or_else(|| Error::invalid_schema("elapsed seconds need a start member"))?;
        Ok(if negate {
            format!("NOT ({start}>0)")
        } else {
            format!("({start}>0)")
        })
    }

    fn where_comparison(
        &self,
        _field: &Field,
        columns: &[String],
        op: &str,
        operand: &str,
        field_on_left: bool,
    ) -> Result<String> {
        let elapsed = Self::sql(columns, chrono::Local::now().timestamp())?;
        Ok(if field_on_left {
            format!("{elapsed} {op} {operand}")
        } else {
            format!("{operand} {op} {elapsed}")
        })
    }

    fn select(&self, columns: &[String]) -> Option<String> {
        Self::sql(columns, chrono::Local::now().timestamp()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_fills_placeholders_in_order() {
        let dispatcher = Formatted::new("{}@{}:{}");
        let value = dispatcher.value(&["joe".into(), "farm01".into(), 9005.into()], 0);
        assert_eq!(value, Value::from("joe@farm01:9005"));
    }

    #[test]
    fn elapsed_uses_now_while_running() {
        let elapsed = ElapsedSecs;
        assert_eq!(elapsed.value(&[100.into(), 0.into()], 160), Value::I64(60));
        assert_eq!(elapsed.value(&[100.into(), 130.into()], 160), Value::I64(30));
        assert_eq!(elapsed.value(&[0.into(), 130.into()], 160), Value::I64(0));
    }
}
