use super::value::timestamp_to_epoch;
use super::Value;

use std::cmp::Ordering;

impl Value {
    /// Total order over all values.
    ///
    /// `Null` sorts first, then numbers (booleans count as 0/1 and timestamps
    /// as local epoch seconds), then strings, lists and finally JSON. Having
    /// one order for every pair of values keeps `not (a < b)` equivalent to
    /// `a >= b` even when the operands have different types.
    pub fn cmp_total(&self, other: &Value) -> Ordering {
        let rank = self.rank().cmp(&other.rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::I64(a), Value::I64(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (a, b) in a.iter().zip(b.iter()) {
                    match a.cmp_total(b) {
                        Ordering::Equal => {}
                        ord => return ord,
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Json(a), Value::Json(b)) => a.to_string().cmp(&b.to_string()),
            (a, b) => a.number().total_cmp(&b.number()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) | Value::I64(_) | Value::F64(_) | Value::Timestamp(_) => 1,
            Value::String(_) => 2,
            Value::List(_) => 3,
            Value::Json(_) => 4,
        }
    }

    fn number(&self) -> f64 {
        match self {
            Value::Bool(v) => *v as i64 as f64,
            Value::I64(v) => *v as f64,
            Value::F64(v) => *v,
            Value::Timestamp(v) => timestamp_to_epoch(v) as f64,
            _ => 0.0,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.cmp_total(other) == Ordering::Equal
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        Some(self.cmp_total(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    #[test]
    fn null_sorts_first() {
        assert!(Value::Null < Value::from(-100));
        assert!(Value::Null < Value::from(""));
        assert!(Value::from(i64::MAX) < Value::from("0"));
    }

    #[test]
    fn numbers_compare_across_types() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_eq!(Value::from(true), Value::from(1));
        assert!(Value::from(2) > Value::from(1.5));
    }

    #[test]
    fn timestamps_compare_as_epoch_seconds() {
        let local = Local.with_ymd_and_hms(2024, 3, 15, 16, 0, 0).unwrap();
        let ts = Value::Timestamp(local.naive_local());
        assert_eq!(ts, Value::from(local.timestamp()));
        assert!(ts > Value::from(local.timestamp() - 1));
    }

    #[test]
    fn lists_compare_lexicographically() {
        let a = Value::from(vec![1, 2]);
        let b = Value::from(vec![1, 3]);
        assert!(a < b);
        assert!(Value::from(vec![1]) < a);
    }
}
