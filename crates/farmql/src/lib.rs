mod config;
pub use config::Config;

pub mod db;
pub use db::{Db, Query};

pub mod filter;
pub use filter::{CommandRunner, ShellCommand, Where};

pub mod format;

mod object;
pub use object::{DbObject, ObjectState};

mod query_result;
pub use query_result::QueryResult;

pub mod simplify;

pub use farmql_core::{driver, schema, stmt, Error, Result, Schema};
pub(crate) use farmql_core::{bail, err};

#[cfg(test)]
mod fixtures;
