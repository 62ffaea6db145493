use super::{Category, Field, FieldKind};
use crate::{bail, stmt::Value, Error, Result};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

/// A member value converted to its storage representation.
///
/// The SQL serializer turns it into a literal for the target dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum Packed {
    Null,

    /// Let the store choose the value (auto-increment keys).
    Default,

    Integer(i64),

    Real(f64),

    Text(String),
}

impl Packed {
    /// The value a store returns when this packed value is read back.
    pub fn to_stored(&self) -> Value {
        match self {
            Packed::Null | Packed::Default => Value::Null,
            Packed::Integer(v) => Value::I64(*v),
            Packed::Real(v) => Value::F64(*v),
            Packed::Text(v) => Value::String(v.clone()),
        }
    }
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl Field {
    /// Converts a member value into its storage representation.
    pub fn pack(&self, value: &Value) -> Result<Packed> {
        use FieldKind::*;

        match &self.kind {
            AutoInc | Serial => match value {
                Value::Null => Ok(Packed::Default),
                value => match value.as_i64() {
                    Some(id) if id <= 0 => Ok(Packed::Default),
                    Some(id) => Ok(Packed::Integer(id)),
                    None => Err(Error::pack(&self.member, value, "an integer")),
                },
            },
            TinyInt { unsigned } => self.pack_clamped(value, bounds(8, *unsigned)),
            SmallInt { unsigned } => self.pack_clamped(value, bounds(16, *unsigned)),
            Virtual => bail!("virtual member '{}' has no storage", self.member),
            _ => match self.category() {
                Category::Int => self.pack_clamped(value, (i64::MIN, i64::MAX)),
                Category::Float => match value {
                    Value::Null => Ok(Packed::Null),
                    value => value
                        .as_f64()
                        .map(Packed::Real)
                        .ok_or_else(|| Error::pack(&self.member, value, "a float")),
                },
                Category::Boolean => Ok(Packed::Text(
                    if is_falsy(value) { "f" } else { "t" }.to_string(),
                )),
                Category::Timestamp => self.pack_timestamp(value),
                Category::String => self.pack_string(value),
                Category::StringList | Category::IntList => self.pack_list(value),
                Category::StringArray | Category::IntArray => self.pack_array(value),
                Category::Dict => match value {
                    Value::Null => Ok(Packed::Null),
                    Value::Json(serde_json::Value::Object(map)) if map.is_empty() => {
                        Ok(Packed::Null)
                    }
                    Value::Json(json @ serde_json::Value::Object(_)) => {
                        Ok(Packed::Text(json.to_string()))
                    }
                    Value::String(text) if text.is_empty() => Ok(Packed::Null),
                    Value::String(text) => match serde_json::from_str(text) {
                        Ok(serde_json::Value::Object(_)) => Ok(Packed::Text(text.clone())),
                        _ => Err(Error::pack(&self.member, value, "a dict")),
                    },
                    value => Err(Error::pack(&self.member, value, "a dict")),
                },
                Category::Json => match value {
                    Value::Null | Value::Json(serde_json::Value::Null) => Ok(Packed::Null),
                    value => Ok(Packed::Text(to_json(value).to_string())),
                },
                Category::Discriminator => match value {
                    Value::Null => Ok(Packed::Null),
                    value => Ok(Packed::Text(value.to_text())),
                },
                Category::Virtual => bail!("virtual member '{}' has no storage", self.member),
            },
        }
    }

    /// Converts a value read from storage into the member value.
    pub fn unpack(&self, stored: &Value) -> Result<Value> {
        match self.category() {
            Category::Int => match stored {
                Value::Null => Ok(self.default.clone()),
                stored => stored
                    .as_i64()
                    .map(Value::I64)
                    .ok_or_else(|| Error::pack(&self.member, stored, "an integer")),
            },
            Category::Float => match stored {
                Value::Null => Ok(self.default.clone()),
                stored => stored
                    .as_f64()
                    .map(Value::F64)
                    .ok_or_else(|| Error::pack(&self.member, stored, "a float")),
            },
            Category::Boolean => Ok(Value::Bool(!is_falsy(stored))),
            Category::Timestamp => match stored {
                Value::Null => Ok(Value::Null),
                Value::String(text) if text.is_empty() => Ok(Value::Null),
                stored => to_timestamp(stored)
                    .map(Value::Timestamp)
                    .ok_or_else(|| Error::pack(&self.member, stored, "a timestamp")),
            },
            Category::String => match stored {
                Value::Null => Ok(self.default.clone()),
                Value::String(_) => Ok(stored.clone()),
                stored => Ok(Value::String(stored.to_text())),
            },
            Category::StringList | Category::IntList => {
                let separator = self.kind.separator().unwrap_or(',');
                let items = match stored {
                    Value::Null => return Ok(Value::List(vec![])),
                    Value::List(items) => items.iter().map(Value::to_text).collect(),
                    stored => {
                        let text = stored.to_text();
                        if text.is_empty() {
                            return Ok(Value::List(vec![]));
                        }
                        text.split(separator).map(str::to_string).collect::<Vec<_>>()
                    }
                };
                self.list_items(items)
            }
            Category::StringArray | Category::IntArray => {
                let items = match stored {
                    Value::Null => return Ok(Value::List(vec![])),
                    Value::List(items) => items.iter().map(Value::to_text).collect(),
                    stored => parse_array(&stored.to_text()),
                };
                self.list_items(items)
            }
            Category::Dict => match stored {
                Value::Null => Ok(Value::Json(serde_json::Value::Object(Default::default()))),
                Value::String(text) if text.is_empty() => {
                    Ok(Value::Json(serde_json::Value::Object(Default::default())))
                }
                Value::String(text) => Ok(Value::Json(serde_json::from_str(text)?)),
                Value::Json(_) => Ok(stored.clone()),
                stored => Err(Error::pack(&self.member, stored, "a dict")),
            },
            Category::Json => match stored {
                Value::Null => Ok(Value::Null),
                Value::String(text) if text.is_empty() => Ok(Value::Null),
                Value::String(text) => match serde_json::from_str(text)? {
                    serde_json::Value::Null => Ok(Value::Null),
                    json => Ok(Value::Json(json)),
                },
                stored => Ok(stored.clone()),
            },
            Category::Discriminator => match stored {
                Value::Null => Ok(Value::Null),
                stored => Ok(Value::String(stored.to_text())),
            },
            Category::Virtual => Ok(Value::Null),
        }
    }

    fn pack_clamped(&self, value: &Value, (min, max): (i64, i64)) -> Result<Packed> {
        match value {
            Value::Null => Ok(Packed::Null),
            value => value
                .as_i64()
                .map(|v| Packed::Integer(v.clamp(min, max)))
                .ok_or_else(|| Error::pack(&self.member, value, "an integer")),
        }
    }

    fn pack_timestamp(&self, value: &Value) -> Result<Packed> {
        if !value.is_truthy() {
            return Ok(Packed::Null);
        }

        to_timestamp(value)
            .map(|ts| Packed::Text(ts.format(TIMESTAMP_FORMAT).to_string()))
            .ok_or_else(|| Error::pack(&self.member, value, "a timestamp"))
    }

    fn pack_string(&self, value: &Value) -> Result<Packed> {
        match value {
            Value::Null if self.default.is_null() => Ok(Packed::Null),
            Value::Null => Ok(Packed::Text(String::new())),
            Value::List(_) => Err(Error::pack(&self.member, value, "a string")),
            Value::Json(json) => Ok(Packed::Text(json.to_string())),
            value => Ok(Packed::Text(value.to_text())),
        }
    }

    fn pack_list(&self, value: &Value) -> Result<Packed> {
        let separator = self.kind.separator().unwrap_or(',');

        let items = match value {
            Value::Null => return Ok(Packed::Null),
            Value::String(text) if text.is_empty() => return Ok(Packed::Null),
            Value::String(text) => return Ok(Packed::Text(text.clone())),
            Value::List(items) if items.is_empty() => return Ok(Packed::Null),
            Value::List(items) => items,
            value => return Err(Error::pack(&self.member, value, "a list")),
        };

        let mut texts = Vec::with_capacity(items.len());
        for item in items {
            let text = self.list_item_text(item)?;
            if text.is_empty() {
                return Err(Error::pack(&self.member, "''", "a non-empty list item"));
            }
            if text.contains(separator) {
                return Err(Error::pack(
                    &self.member,
                    format!("'{text}'"),
                    format!("a list item without the separator '{separator}'"),
                ));
            }
            texts.push(text);
        }

        Ok(Packed::Text(texts.join(&separator.to_string())))
    }

    fn pack_array(&self, value: &Value) -> Result<Packed> {
        let items = match value {
            Value::Null => return Ok(Packed::Null),
            Value::String(text) => return Ok(Packed::Text(text.clone())),
            Value::List(items) => items,
            value => return Err(Error::pack(&self.member, value, "a list")),
        };

        let mut out = String::from("{");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let text = self.list_item_text(item)?;
            if self.category() == Category::IntArray {
                out.push_str(&text);
            } else {
                out.push('"');
                for c in text.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            }
        }
        out.push('}');

        Ok(Packed::Text(out))
    }

    fn list_item_text(&self, item: &Value) -> Result<String> {
        match self.category() {
            Category::IntList | Category::IntArray => item
                .as_i64()
                .map(|v| v.to_string())
                .ok_or_else(|| Error::pack(&self.member, item, "an integer list")),
            _ => Ok(item.to_text()),
        }
    }

    fn list_items(&self, items: Vec<String>) -> Result<Value> {
        match self.category() {
            Category::IntList | Category::IntArray => items
                .iter()
                .map(|item| {
                    item.trim()
                        .parse::<i64>()
                        .map(Value::I64)
                        .map_err(|_| Error::pack(&self.member, item, "an integer list"))
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            _ => Ok(Value::List(items.into_iter().map(Value::String).collect())),
        }
    }
}

/// The integer range of a signed or unsigned column of `bits` width.
fn bounds(bits: u32, unsigned: bool) -> (i64, i64) {
    if unsigned {
        (0, (1i64 << bits) - 1)
    } else {
        (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
    }
}

/// Values stored as false in boolean columns.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(v) => !v,
        Value::I64(v) => *v == 0,
        Value::F64(v) => *v == 0.0,
        Value::String(v) => matches!(v.to_lowercase().as_str(), "f" | "n" | "no" | "0" | ""),
        _ => false,
    }
}

/// Reads a timestamp from an epoch number, a timestamp or date/time text.
pub fn to_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::I64(secs) => epoch_to_local(*secs),
        Value::F64(secs) => epoch_to_local(*secs as i64),
        Value::String(text) => parse_timestamp(text),
        _ => None,
    }
}

/// Local wall-clock time of an epoch.
pub fn epoch_to_local(secs: i64) -> Option<NaiveDateTime> {
    match Local.timestamp_opt(secs, 0).earliest() {
        Some(local) => Some(local.naive_local()),
        None => DateTime::from_timestamp(secs, 0).map(|utc| utc.naive_utc()),
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    for format in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    // timezone-qualified values are converted to local time
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.with_timezone(&Local).naive_local())
}

/// Parses an array literal such as `{a,"b,c",d}`.
fn parse_array(text: &str) -> Vec<String> {
    let text = text.trim();
    let inner = text
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(text);

    let mut items = vec![];
    if inner.trim().is_empty() {
        return items;
    }

    let mut current = String::new();
    let mut chars = inner.chars();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '"' => quoted = !quoted,
            ',' if !quoted => items.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    items.push(current);

    items
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(v) => serde_json::Value::Bool(*v),
        Value::I64(v) => serde_json::Value::from(*v),
        Value::F64(v) => serde_json::Value::from(*v),
        Value::String(v) => serde_json::Value::String(v.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Json(json) => json.clone(),
        Value::Timestamp(ts) => serde_json::Value::String(ts.format(TIMESTAMP_FORMAT).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, Schema, TableDef};
    use pretty_assertions::assert_eq;

    fn field(kind: FieldKind) -> Field {
        let schema = Schema::builder()
            .table(TableDef::new("T").field(FieldDef::new("f", kind)))
            .build()
            .unwrap();
        schema.tables[0].fields[0].clone()
    }

    fn round_trip(field: &Field, value: Value) -> Value {
        let packed = field.pack(&value).unwrap();
        field.unpack(&packed.to_stored()).unwrap()
    }

    #[test]
    fn boolean_literals() {
        let field = field(FieldKind::Boolean);

        assert_eq!(field.pack(&Value::Null).unwrap(), Packed::Text("f".into()));
        assert_eq!(field.pack(&true.into()).unwrap(), Packed::Text("t".into()));
        assert_eq!(field.pack(&"no".into()).unwrap(), Packed::Text("f".into()));
        assert_eq!(field.unpack(&"f".into()).unwrap(), Value::Bool(false));
        assert_eq!(field.unpack(&0.into()).unwrap(), Value::Bool(false));
        assert_eq!(field.unpack(&"t".into()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn small_integers_clamp() {
        let tiny = field(FieldKind::TinyInt { unsigned: false });
        assert_eq!(tiny.pack(&1000.into()).unwrap(), Packed::Integer(127));
        assert_eq!(tiny.pack(&(-1000).into()).unwrap(), Packed::Integer(-128));

        let tiny = field(FieldKind::TinyInt { unsigned: true });
        assert_eq!(tiny.pack(&1000.into()).unwrap(), Packed::Integer(255));
        assert_eq!(tiny.pack(&(-5).into()).unwrap(), Packed::Integer(0));

        let small = field(FieldKind::SmallInt { unsigned: false });
        assert_eq!(small.pack(&100_000.into()).unwrap(), Packed::Integer(32767));

        let small = field(FieldKind::SmallInt { unsigned: true });
        assert_eq!(small.pack(&100_000.into()).unwrap(), Packed::Integer(65535));
    }

    #[test]
    fn non_numeric_integer_is_a_pack_error() {
        let int = field(FieldKind::Int);
        let err = int.pack(&"lots".into()).unwrap_err();
        assert!(err.is_pack());
        assert_eq!(
            err.to_string(),
            "Cannot convert member \"f\" to an integer. Got lots"
        );
    }

    #[test]
    fn auto_increment_placeholder() {
        let id = field(FieldKind::AutoInc);
        assert_eq!(id.pack(&Value::Null).unwrap(), Packed::Default);
        assert_eq!(id.pack(&0.into()).unwrap(), Packed::Default);
        assert_eq!(id.pack(&50.into()).unwrap(), Packed::Integer(50));
        assert_eq!(id.default, Value::I64(0));
    }

    #[test]
    fn lists_round_trip() {
        let list = field(FieldKind::str_list());
        assert_eq!(list.pack(&Value::List(vec![])).unwrap(), Packed::Null);
        assert_eq!(list.unpack(&Value::Null).unwrap(), Value::List(vec![]));
        assert_eq!(
            list.pack(&Value::from(vec!["a", "b"])).unwrap(),
            Packed::Text("a,b".into())
        );
        assert_eq!(
            round_trip(&list, Value::from(vec!["lgt", "fx"])),
            Value::from(vec!["lgt", "fx"])
        );

        let ints = field(FieldKind::int_list());
        assert_eq!(
            round_trip(&ints, Value::from(vec![3, 4, 5])),
            Value::from(vec![3, 4, 5])
        );
    }

    #[test]
    fn list_item_with_separator_is_rejected() {
        let list = field(FieldKind::str_list());
        let err = list.pack(&Value::from(vec!["a,b", "c"])).unwrap_err();
        assert!(err.is_pack());
    }

    #[test]
    fn empty_list_item_is_rejected() {
        let list = field(FieldKind::str_list());
        assert!(list.pack(&Value::from(vec![""])).unwrap_err().is_pack());
        assert!(list.pack(&Value::from(vec!["a", ""])).unwrap_err().is_pack());
        assert_eq!(list.pack(&Value::List(vec![])).unwrap(), Packed::Null);
    }

    #[test]
    fn arrays_round_trip() {
        let strs = field(FieldKind::StrArray);
        let value = Value::from(vec!["a", "b \"c\"", "d,e"]);
        assert_eq!(
            strs.pack(&value).unwrap(),
            Packed::Text(r#"{"a","b \"c\"","d,e"}"#.into())
        );
        assert_eq!(round_trip(&strs, value.clone()), value);

        let ints = field(FieldKind::IntArray);
        assert_eq!(
            ints.pack(&Value::from(vec![1, 2])).unwrap(),
            Packed::Text("{1,2}".into())
        );
        assert_eq!(round_trip(&ints, Value::List(vec![])), Value::List(vec![]));
    }

    #[test]
    fn dict_and_json_empty_values() {
        let dict = field(FieldKind::Dict);
        assert_eq!(dict.unpack(&Value::Null).unwrap(), Value::Json(serde_json::json!({})));
        assert_eq!(dict.pack(&Value::Json(serde_json::json!({}))).unwrap(), Packed::Null);

        let value = Value::Json(serde_json::json!({"threads": 4}));
        assert_eq!(round_trip(&dict, value.clone()), value);

        let json = field(FieldKind::Json);
        assert_eq!(json.unpack(&"".into()).unwrap(), Value::Null);
        let value = Value::Json(serde_json::json!([1, "two"]));
        assert_eq!(round_trip(&json, value.clone()), value);
    }

    #[test]
    fn timestamps_round_trip() {
        let ts = field(FieldKind::Timestamp);
        assert_eq!(ts.pack(&Value::Null).unwrap(), Packed::Null);

        let when = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(16, 30, 0)
            .unwrap();
        assert_eq!(
            ts.pack(&Value::Timestamp(when)).unwrap(),
            Packed::Text("2024-03-15 16:30:00".into())
        );
        assert_eq!(round_trip(&ts, Value::Timestamp(when)), Value::Timestamp(when));
    }

    #[test]
    fn null_string_packs_as_its_default() {
        let text = field(FieldKind::Text);
        assert_eq!(text.pack(&Value::Null).unwrap(), Packed::Text(String::new()));
        assert_eq!(text.unpack(&Value::Null).unwrap(), Value::from(""));
        assert_eq!(round_trip(&text, "it's".into()), Value::from("it's"));
    }
}
