use super::Statement;

use farmql_core::schema::{Packed, TableId};

#[derive(Debug, Clone)]
pub struct Update {
    pub table: TableId,

    /// Column name and new value.
    pub assignments: Vec<(String, Packed)>,

    pub filter: Option<String>,
}

impl From<Update> for Statement {
    fn from(value: Update) -> Self {
        Self::Update(value)
    }
}
