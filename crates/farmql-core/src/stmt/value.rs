use chrono::{Local, NaiveDateTime, TimeZone};
use std::fmt;

/// A dynamically typed value: a literal in a WHERE string, an unpacked
/// member of an object, or a column read back from the store.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    List(Vec<Value>),
    Json(serde_json::Value),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn null() -> Value {
        Value::Null
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Python-style truthiness. `Null`, `false`, zero, empty strings, empty
    /// lists and empty JSON containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(v) => *v,
            Value::I64(v) => *v != 0,
            Value::F64(v) => *v != 0.0,
            Value::String(v) => !v.is_empty(),
            Value::List(v) => !v.is_empty(),
            Value::Json(v) => match v {
                serde_json::Value::Null => false,
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
                serde_json::Value::String(s) => !s.is_empty(),
                serde_json::Value::Array(a) => !a.is_empty(),
                serde_json::Value::Object(o) => !o.is_empty(),
            },
            Value::Timestamp(_) => true,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            Value::F64(v) if v.is_finite() => Some(*v as i64),
            Value::String(v) => v
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| v.trim().parse::<f64>().ok().map(|f| f as i64)),
            Value::Timestamp(v) => Some(timestamp_to_epoch(v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(v) => Some(*v as i64 as f64),
            Value::I64(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            Value::String(v) => v.trim().parse::<f64>().ok(),
            Value::Timestamp(v) => Some(timestamp_to_epoch(v) as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Renders the value as plain text, the way it reads when printed or
    /// searched with a regular expression.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(v) => v.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(" "),
            other => other.to_string(),
        }
    }
}

/// Seconds since the epoch of a local wall-clock time.
pub(crate) fn timestamp_to_epoch(ts: &NaiveDateTime) -> i64 {
    match Local.from_local_datetime(ts).earliest() {
        Some(local) => local.timestamp(),
        None => ts.and_utc().timestamp(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F64(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Value::String(v) => f.write_str(v),
            Value::List(items) => {
                f.write_str("[")?;
                let mut s = "";
                for item in items {
                    write!(f, "{s}{item}")?;
                    s = ", ";
                }
                f.write_str("]")
            }
            Value::Json(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Json(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::Json(serde_json::json!({})).is_truthy());
        assert!(Value::from(0.5).is_truthy());
        assert!(Value::from("f").is_truthy());
    }

    #[test]
    fn numeric_views() {
        assert_eq!(Value::from("42").as_i64(), Some(42));
        assert_eq!(Value::from("4.5").as_i64(), Some(4));
        assert_eq!(Value::from(true).as_f64(), Some(1.0));
        assert_eq!(Value::from("abc").as_i64(), None);
    }

    #[test]
    fn text_of_list_is_space_joined() {
        let value = Value::from(vec!["linux", "farm"]);
        assert_eq!(value.to_text(), "linux farm");
        assert_eq!(Value::Null.to_text(), "");
    }
}
