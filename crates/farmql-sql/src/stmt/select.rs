use super::Statement;

use farmql_core::schema::{FieldId, TableId};

#[derive(Debug, Clone)]
pub struct Select {
    /// Table the objects are materialized from.
    pub primary: TableId,

    /// Selected columns. Ignored by counting queries.
    pub columns: Vec<SelectColumn>,

    /// Render `COUNT(*) AS rowcount` instead of the columns.
    pub count: bool,

    /// Joined tables in FROM order.
    pub joins: Vec<Join>,

    /// The compiled WHERE string, wrapped in parentheses.
    pub filter: Option<String>,

    /// Extra conditions ANDed after the WHERE string.
    pub where_args: Vec<String>,

    pub group_by: Vec<String>,

    pub order_by: Vec<OrderBy>,

    pub limit: Option<u64>,

    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// A stored column.
    Field(FieldId),

    /// A computed expression, such as a virtual field.
    Expr { sql: String, alias: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: TableId,
    pub on: String,
    pub left_join: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Select {
    pub fn new(primary: TableId) -> Select {
        Select {
            primary,
            columns: vec![],
            count: false,
            joins: vec![],
            filter: None,
            where_args: vec![],
            group_by: vec![],
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }

    pub fn is_joined(&self) -> bool {
        !self.joins.is_empty()
    }
}

impl From<Select> for Statement {
    fn from(value: Select) -> Self {
        Self::Select(value)
    }
}
