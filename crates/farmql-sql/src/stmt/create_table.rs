use super::Statement;

use farmql_core::schema::TableId;

#[derive(Debug, Clone)]
pub struct CreateTable {
    pub table: TableId,
}

impl Statement {
    pub fn create_table(table: TableId) -> Self {
        CreateTable { table }.into()
    }
}

impl From<CreateTable> for Statement {
    fn from(value: CreateTable) -> Self {
        Self::CreateTable(value)
    }
}
