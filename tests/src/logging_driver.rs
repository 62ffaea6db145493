use farmql_core::{
    async_trait,
    driver::{Capability, Connection, Driver, Operation, Response},
    Result,
};
use std::{
    borrow::Cow,
    sync::{Arc, Mutex},
};

/// Wraps a driver and records every operation sent through its
/// connections.
#[derive(Debug, Clone)]
pub struct LoggingDriver {
    inner: Arc<dyn Driver>,

    ops_log: Arc<Mutex<Vec<Operation>>>,
}

impl LoggingDriver {
    pub fn new(driver: impl Driver) -> Self {
        Self {
            inner: Arc::new(driver),
            ops_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every operation run so far, oldest first.
    pub fn ops(&self) -> Vec<Operation> {
        self.ops_log.lock().unwrap().clone()
    }

    /// The SQL text of every operation that carries some.
    pub fn sql(&self) -> Vec<String> {
        self.ops()
            .iter()
            .filter_map(|op| op.sql().map(str::to_string))
            .collect()
    }

    pub fn clear(&self) {
        self.ops_log.lock().unwrap().clear();
    }
}

#[async_trait]
impl Driver for LoggingDriver {
    fn url(&self) -> Cow<'_, str> {
        self.inner.url()
    }

    fn capability(&self) -> &'static Capability {
        self.inner.capability()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(LoggingConnection {
            inner: self.inner.connect().await?,
            ops_log: self.ops_log.clone(),
        }))
    }

    fn max_connections(&self) -> Option<usize> {
        self.inner.max_connections()
    }

    async fn reset_db(&self) -> Result<()> {
        self.inner.reset_db().await
    }
}

#[derive(Debug)]
struct LoggingConnection {
    inner: Box<dyn Connection>,

    ops_log: Arc<Mutex<Vec<Operation>>>,
}

#[async_trait]
impl Connection for LoggingConnection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        self.ops_log.lock().unwrap().push(op.clone());
        self.inner.exec(op).await
    }
}
