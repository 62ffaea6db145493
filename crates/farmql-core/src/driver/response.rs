use crate::stmt::Value;

use indexmap::IndexMap;

/// A result row, keyed by the selected column name.
pub type Row = IndexMap<String, Value>;

#[derive(Debug)]
pub struct Response {
    pub rows: Rows,

    /// Key assigned by the store to the last inserted row.
    pub last_insert_id: Option<i64>,
}

#[derive(Debug)]
pub enum Rows {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Rows returned by a query
    Values(Vec<Row>),

    /// First id of a reserved range
    Reserved(i64),
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self {
            rows: Rows::Count(count),
            last_insert_id: None,
        }
    }

    pub fn values(rows: Vec<Row>) -> Self {
        Self {
            rows: Rows::Values(rows),
            last_insert_id: None,
        }
    }

    pub fn reserved(first: i64) -> Self {
        Self {
            rows: Rows::Reserved(first),
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: Option<i64>) -> Self {
        self.last_insert_id = id;
        self
    }

    /// Number of affected rows, or of returned rows for queries.
    pub fn row_count(&self) -> u64 {
        match &self.rows {
            Rows::Count(count) => *count,
            Rows::Values(rows) => rows.len() as u64,
            Rows::Reserved(_) => 0,
        }
    }

    pub fn into_values(self) -> crate::Result<Vec<Row>> {
        match self.rows {
            Rows::Values(rows) => Ok(rows),
            rows => Err(crate::Error::invalid_result(format!(
                "expected rows, got {rows:?}"
            ))),
        }
    }

    pub fn into_reserved(self) -> crate::Result<i64> {
        match self.rows {
            Rows::Reserved(first) => Ok(first),
            rows => Err(crate::Error::invalid_result(format!(
                "expected a reserved id range, got {rows:?}"
            ))),
        }
    }
}

impl Rows {
    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }

    pub fn is_values(&self) -> bool {
        matches!(self, Self::Values(_))
    }
}
