use super::Db;
use crate::{CommandRunner, Config, Error, Result, ShellCommand};

use farmql_core::{driver::Driver, Schema};

use std::sync::Arc;

#[derive(Default)]
pub struct Builder {
    schema: Option<Arc<Schema>>,

    config: Config,

    /// Runs backtick commands in WHERE strings. Defaults to the shell.
    commands: Option<Arc<dyn CommandRunner>>,
}

impl Builder {
    pub fn schema(&mut self, schema: impl Into<Arc<Schema>>) -> &mut Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }

    pub fn commands(&mut self, commands: Arc<dyn CommandRunner>) -> &mut Self {
        self.commands = Some(commands);
        self
    }

    /// Connects to the store named by `url`, such as `sqlite::memory:` or
    /// `sqlite:/var/spool/jobs.db`.
    pub async fn connect(&mut self, url: &str) -> Result<Db> {
        let parsed = url::Url::parse(url).map_err(anyhow::Error::from)?;

        match parsed.scheme() {
            "sqlite" => self.connect_sqlite(url).await,
            scheme => Err(Error::storage_connection(format!(
                "unsupported database; scheme={scheme}; url={url}"
            ))),
        }
    }

    #[cfg(feature = "sqlite")]
    async fn connect_sqlite(&mut self, url: &str) -> Result<Db> {
        let driver = farmql_driver_sqlite::Sqlite::new(url)?;
        self.build(driver).await
    }

    #[cfg(not(feature = "sqlite"))]
    async fn connect_sqlite(&mut self, _url: &str) -> Result<Db> {
        Err(Error::storage_connection("`sqlite` feature not enabled"))
    }

    /// Opens a connection through `driver`. The SQL flavor of the
    /// configuration is replaced by the driver's.
    pub async fn build(&mut self, driver: impl Driver) -> Result<Db> {
        let Some(schema) = self.schema.clone() else {
            return Err(Error::invalid_schema("no schema was given to the database builder"));
        };

        let driver: Arc<dyn Driver> = Arc::new(driver);
        let connection = driver.connect().await?;

        let mut config = self.config.clone();
        config.flavor = driver.capability().flavor;

        log::debug!("connected to {} ({})", driver.url(), config.flavor);

        Ok(Db {
            schema,
            config,
            commands: self.commands.clone().unwrap_or_else(|| Arc::new(ShellCommand)),
            driver,
            connection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::tests::Recorder, fixtures};

    use farmql_core::driver::Flavor;

    #[tokio::test]
    async fn flavor_comes_from_the_driver() {
        let db = Db::builder()
            .schema(fixtures::render_farm())
            .config(Config::default().flavor(Flavor::Postgresql).batch_insert_size(10))
            .build(Recorder::default())
            .await
            .unwrap();

        assert_eq!(db.flavor(), Flavor::Sqlite);
        assert_eq!(db.config().batch_insert_size, 10);
    }

    #[tokio::test]
    async fn schema_is_required() {
        let err = Db::builder().build(Recorder::default()).await.unwrap_err();
        assert!(err.is_invalid_schema());
    }

    #[tokio::test]
    async fn unknown_schemes_are_rejected() {
        let err = Db::builder()
            .schema(fixtures::render_farm())
            .connect("oracle://localhost/jobs")
            .await
            .unwrap_err();
        assert!(err.is_storage());
    }
}
