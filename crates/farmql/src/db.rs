mod builder;
pub use builder::Builder;

mod insert;

mod query;
pub use query::Query;

mod select;

mod update;

use crate::{filter, CommandRunner, Config, Error, Result, Where};

use farmql_core::{
    driver::{operation::Transaction, Capability, Connection, Driver, Flavor, Operation, Response},
    schema::{Field, Packed, Table},
    Schema,
};
use farmql_sql::{Serializer, Statement};
use std::sync::Arc;

/// A database handle.
///
/// Each handle owns one connection. Statements run to completion one at a
/// time; work that should run in parallel opens several handles on the same
/// schema.
pub struct Db {
    schema: Arc<Schema>,
    config: Config,
    commands: Arc<dyn CommandRunner>,
    driver: Arc<dyn Driver>,
    connection: Box<dyn Connection>,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn flavor(&self) -> Flavor {
        self.config.flavor
    }

    pub fn driver(&self) -> &dyn Driver {
        &*self.driver
    }

    pub fn capability(&self) -> &'static Capability {
        self.driver.capability()
    }

    /// Finds a table by type or storage name.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.schema
            .table_by_name(name)
            .ok_or_else(|| Error::invalid_member(format!("unknown table '{name}'")))
    }

    /// Resolves a member reference, searching from `table` when given.
    pub fn field_by_member(&self, name: &str, table: Option<&str>) -> Option<&Field> {
        let primary = match table {
            Some(table) => Some(self.schema.table_by_name(table)?.id),
            None => None,
        };
        self.schema.field_by_member(name, primary)
    }

    /// Options for parsing WHERE strings against `table` with this handle's
    /// settings.
    pub fn where_builder(&self, table: &str) -> Result<filter::Builder> {
        let table = self.table(table)?;
        Ok(Where::builder(self.schema.clone(), table.id)
            .strict(self.config.strict)
            .commands(self.commands.clone()))
    }

    pub fn parse_where(&self, table: &str, text: &str) -> Result<Where> {
        self.where_builder(table)?.parse(text)
    }

    pub(crate) fn serializer(&self) -> Serializer<'_> {
        Serializer::new(&self.schema, self.config.flavor)
    }

    /// Creates every table of the schema and its indexes.
    pub async fn create_tables(&mut self) -> Result<()> {
        let mut statements = vec![];
        for table in &self.schema.tables {
            statements.push(Statement::create_table(table.id));
            statements.extend(Statement::create_indexes(table));
        }

        for statement in &statements {
            self.exec(statement).await?;
        }
        Ok(())
    }

    /// Drops all data. Used by tests.
    pub async fn reset_db(&self) -> Result<()> {
        self.driver.reset_db().await
    }

    pub async fn begin(&mut self) -> Result<()> {
        self.exec_op(Operation::Transaction(Transaction::Start)).await?;
        Ok(())
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.exec_op(Operation::Transaction(Transaction::Commit)).await?;
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.exec_op(Operation::Transaction(Transaction::Rollback)).await?;
        Ok(())
    }

    /// Serializes and runs a statement.
    pub(crate) async fn exec(&mut self, statement: &Statement) -> Result<Response> {
        let sql = self.serializer().serialize(statement);

        let op = if statement.is_select() {
            Operation::QuerySql(sql)
        } else {
            Operation::ExecSql(sql)
        };

        self.exec_op(op).await
    }

    pub(crate) async fn exec_op(&mut self, op: Operation) -> Result<Response> {
        let writes = !matches!(op, Operation::QuerySql(_) | Operation::Transaction(_));
        if writes && self.config.read_only {
            return Err(Error::storage_read_only(match op.sql() {
                Some(sql) => format!("refusing to run '{sql}'"),
                None => format!("refusing to run {op:?}"),
            }));
        }

        match op.sql() {
            Some(sql) => log::debug!("{sql}"),
            None => log::debug!("{op:?}"),
        }

        self.connection.exec(op).await.inspect_err(|err| {
            log::warn!("statement failed: {err}");
        })
    }

    /// A WHERE clause body matching the record of `fields` with the given
    /// packed values.
    pub(crate) fn match_values<'f>(&self, fields: impl IntoIterator<Item = (&'f Field, Packed)>) -> String {
        let serializer = self.serializer();
        fields
            .into_iter()
            .map(|(field, value)| match value {
                Packed::Null | Packed::Default => format!("{} IS NULL", field.qualified_name()),
                value => format!("{}={}", field.qualified_name(), serializer.literal(&value)),
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("driver", &self.driver)
            .field("config", &self.config)
            .field("connection", &self.connection)
            .finish()
    }
}
