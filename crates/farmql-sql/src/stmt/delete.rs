use super::Statement;

use farmql_core::schema::TableId;

#[derive(Debug, Clone)]
pub struct Delete {
    pub table: TableId,

    /// `None` deletes every row.
    pub filter: Option<String>,
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Self {
        Self::Delete(value)
    }
}
