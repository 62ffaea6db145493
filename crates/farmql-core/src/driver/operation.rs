/// A unit of work sent to a [`Connection`](super::Connection).
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Run a statement that returns rows.
    QuerySql(String),

    /// Run a statement that returns an affected-row count.
    ExecSql(String),

    /// Reserve a range of auto-increment ids.
    ReserveIds(ReserveIds),

    /// Execute a transaction lifecycle op
    Transaction(Transaction),
}

/// Advances the auto-increment counter of `table.column` by `count` and
/// answers with the first id of the reserved range.
#[derive(Debug, Clone, PartialEq)]
pub struct ReserveIds {
    pub table: String,
    pub column: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    Start,
    Commit,
    Rollback,
}

impl Operation {
    pub fn query(sql: impl Into<String>) -> Operation {
        Operation::QuerySql(sql.into())
    }

    pub fn exec(sql: impl Into<String>) -> Operation {
        Operation::ExecSql(sql.into())
    }

    pub fn reserve_ids(table: impl Into<String>, column: impl Into<String>, count: u64) -> Operation {
        Operation::ReserveIds(ReserveIds {
            table: table.into(),
            column: column.into(),
            count,
        })
    }

    /// The SQL text, if the operation carries any.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Operation::QuerySql(sql) | Operation::ExecSql(sql) => Some(sql),
            _ => None,
        }
    }
}
