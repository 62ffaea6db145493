use farmql_core::stmt::Value as CoreValue;
use rusqlite::{types::ValueRef, Row};

#[derive(Debug)]
pub struct Value(CoreValue);

impl Value {
    pub fn into_inner(self) -> CoreValue {
        self.0
    }

    /// Converts the column at `index` of a SQLite row. Columns carry no
    /// declared type here; fields unpack the stored value afterwards.
    pub fn from_sql(row: &Row<'_>, index: usize) -> rusqlite::Result<Self> {
        let value = match row.get_ref(index)? {
            ValueRef::Null => CoreValue::Null,
            ValueRef::Integer(value) => CoreValue::I64(value),
            ValueRef::Real(value) => CoreValue::F64(value),
            ValueRef::Text(value) | ValueRef::Blob(value) => {
                CoreValue::String(String::from_utf8_lossy(value).into_owned())
            }
        };

        Ok(Value(value))
    }
}
