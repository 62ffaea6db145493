use super::Statement;

use farmql_core::schema::{Packed, TableId};

/// A multi-row INSERT. Every row holds one packed value per column.
#[derive(Debug, Clone)]
pub struct Insert {
    pub table: TableId,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Packed>>,
}

impl Insert {
    pub fn new(table: TableId, columns: Vec<String>) -> Insert {
        Insert {
            table,
            columns,
            rows: vec![],
        }
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Self::Insert(value)
    }
}
