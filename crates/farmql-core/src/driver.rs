mod capability;
pub use capability::{Capability, Flavor};

mod response;
pub use response::{Response, Row, Rows};

pub mod operation;
pub use operation::Operation;

use crate::{async_trait, Result};

use std::{borrow::Cow, fmt::Debug};

#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Returns the URL this driver is connecting to.
    fn url(&self) -> Cow<'_, str>;

    /// Describes the SQL dialect and features of the store.
    fn capability(&self) -> &'static Capability;

    /// Creates a new connection to the store.
    async fn connect(&self) -> Result<Box<dyn Connection>>;

    /// Maximum number of simultaneous connections, `None` for no limit.
    fn max_connections(&self) -> Option<usize> {
        None
    }

    /// Drops all data. Used by tests.
    async fn reset_db(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait Connection: Debug + Send + 'static {
    /// Executes a storage operation.
    async fn exec(&mut self, op: Operation) -> Result<Response>;
}
