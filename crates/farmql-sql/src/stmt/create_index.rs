use super::Statement;

use farmql_core::schema::{FieldId, Table};

#[derive(Debug, Clone)]
pub struct CreateIndex {
    /// The indexed column.
    pub field: FieldId,
}

impl Statement {
    /// One CREATE INDEX per indexed column that is not a key.
    pub fn create_indexes(table: &Table) -> Vec<Statement> {
        table
            .columns()
            .filter(|field| field.index && !field.key)
            .map(|field| CreateIndex { field: field.id }.into())
            .collect()
    }
}

impl From<CreateIndex> for Statement {
    fn from(value: CreateIndex) -> Self {
        Self::CreateIndex(value)
    }
}
