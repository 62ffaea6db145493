mod value;
pub(crate) use value::Value;

use farmql_core::{
    async_trait,
    driver::{
        operation::{ReserveIds, Transaction},
        Capability, Driver, Operation, Response, Row,
    },
    Error, Result,
};
use regex::Regex;
use rusqlite::{
    functions::FunctionFlags, Connection as RusqliteConnection, OptionalExtension,
};
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
    sync::Arc,
};
use url::Url;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Create a new SQLite driver with an arbitrary connection URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str)
            .map_err(|err| Error::storage_connection(format!("{err}; url={url_str}")))?;

        if url.scheme() != "sqlite" {
            return Err(Error::storage_connection(format!(
                "connection URL does not have a `sqlite` scheme; url={url_str}"
            )));
        }

        if url.path() == ":memory:" {
            Ok(Self::InMemory)
        } else {
            Ok(Self::File(PathBuf::from(url.path())))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn url(&self) -> Cow<'_, str> {
        match self {
            Sqlite::InMemory => Cow::Borrowed("sqlite::memory:"),
            Sqlite::File(path) => Cow::Owned(format!("sqlite:{}", path.display())),
        }
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    async fn connect(&self) -> Result<Box<dyn farmql_core::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory => Connection::in_memory()?,
        };
        Ok(Box::new(connection))
    }

    fn max_connections(&self) -> Option<usize> {
        matches!(self, Self::InMemory).then_some(1)
    }

    async fn reset_db(&self) -> Result<()> {
        match self {
            Sqlite::File(path) => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
            // every connect() opens a fresh in-memory database
            Sqlite::InMemory => {}
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection = RusqliteConnection::open_in_memory().map_err(storage_error)?;
        Self::setup(connection)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(storage_error)?;
        Self::setup(connection)
    }

    fn setup(connection: RusqliteConnection) -> Result<Self> {
        // `x REGEXP y` calls regexp(y, x)
        connection
            .create_scalar_function(
                "regexp",
                2,
                FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
                |ctx| {
                    let pattern: Arc<Regex> = ctx.get_or_create_aux(0, |value| -> std::result::Result<_, BoxError> {
                        Ok(Regex::new(value.as_str()?)?)
                    })?;

                    let text = match ctx.get_raw(1) {
                        rusqlite::types::ValueRef::Null => return Ok(false),
                        value => value.as_str().map_err(|err| rusqlite::Error::UserFunctionError(err.into()))?,
                    };

                    Ok(pattern.is_match(text))
                },
            )
            .map_err(storage_error)?;

        Ok(Self { connection })
    }

    fn query(&mut self, sql: &str) -> Result<Response> {
        let mut stmt = self.connection.prepare(sql).map_err(storage_error)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();

        let mut rows = stmt.query([]).map_err(storage_error)?;
        let mut ret = vec![];

        while let Some(row) = rows.next().map_err(storage_error)? {
            let mut record = Row::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                let value = Value::from_sql(row, index).map_err(storage_error)?;
                record.insert(column.clone(), value.into_inner());
            }
            ret.push(record);
        }

        Ok(Response::values(ret))
    }

    fn execute(&mut self, sql: &str) -> Result<Response> {
        let count = self.connection.execute(sql, []).map_err(storage_error)?;

        let last_insert_id = sql
            .trim_start()
            .get(..6)
            .is_some_and(|verb| verb.eq_ignore_ascii_case("insert"))
            .then(|| self.connection.last_insert_rowid());

        Ok(Response::count(count as u64).with_last_insert_id(last_insert_id))
    }

    /// Moves the AUTOINCREMENT counter of a table past `count` new ids.
    fn reserve_ids(&mut self, op: &ReserveIds) -> Result<Response> {
        let savepoint = self.connection.savepoint().map_err(storage_error)?;

        let has_sequence: bool = savepoint
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='sqlite_sequence'",
                [],
                |row| row.get(0),
            )
            .map_err(storage_error)?;

        let sequence: Option<i64> = if has_sequence {
            savepoint
                .query_row(
                    "SELECT seq FROM sqlite_sequence WHERE name=?1",
                    [&op.table],
                    |row| row.get(0),
                )
                .optional()
                .map_err(storage_error)?
        } else {
            None
        };

        let max: Option<i64> = savepoint
            .query_row(
                &format!("SELECT MAX({}) FROM {}", op.column, op.table),
                [],
                |row| row.get(0),
            )
            .map_err(storage_error)?;

        let current = sequence.unwrap_or(0).max(max.unwrap_or(0));
        let last = current + op.count as i64;

        if has_sequence {
            let updated = savepoint
                .execute(
                    "UPDATE sqlite_sequence SET seq=?1 WHERE name=?2",
                    rusqlite::params![last, op.table],
                )
                .map_err(storage_error)?;

            if updated == 0 {
                savepoint
                    .execute(
                        "INSERT INTO sqlite_sequence (name, seq) VALUES (?1, ?2)",
                        rusqlite::params![op.table, last],
                    )
                    .map_err(storage_error)?;
            }
        }

        savepoint.commit().map_err(storage_error)?;

        log::trace!("reserved {} ids of {} starting at {}", op.count, op.table, current + 1);
        Ok(Response::reserved(current + 1))
    }
}

#[async_trait]
impl farmql_core::driver::Connection for Connection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(sql) => self.query(&sql),
            Operation::ExecSql(sql) => self.execute(&sql),
            Operation::ReserveIds(op) => self.reserve_ids(&op),
            Operation::Transaction(Transaction::Start) => {
                self.connection.execute("BEGIN", []).map_err(storage_error)?;
                Ok(Response::count(0))
            }
            Operation::Transaction(Transaction::Commit) => {
                self.connection.execute("COMMIT", []).map_err(storage_error)?;
                Ok(Response::count(0))
            }
            Operation::Transaction(Transaction::Rollback) => {
                self.connection.execute("ROLLBACK", []).map_err(storage_error)?;
                Ok(Response::count(0))
            }
        }
    }
}

fn storage_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        let duplicate = failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY;
        if duplicate {
            return Error::storage_duplicate_insert(message.clone().unwrap_or_else(|| err.to_string()));
        }
    }
    Error::storage_driver(err)
}
