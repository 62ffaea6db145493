mod logging_driver;
pub use logging_driver::LoggingDriver;

use farmql::{
    schema::{ElapsedSecs, FieldDef, FieldKind, TableDef, VirtualDef},
    Config, Db, Schema,
};
use std::sync::Arc;

/// Jobs, their tasks and the commands the tasks run, plus the blades that
/// run them.
pub fn render_farm() -> Arc<Schema> {
    let schema = Schema::builder()
        .table(
            TableDef::new("Job")
                .field(FieldDef::new("jobid", FieldKind::AutoInc).key())
                .field(FieldDef::new("user", FieldKind::VarChar(16)).equiv_key().index())
                .field(FieldDef::new("title", FieldKind::Text).equiv_key())
                .field(FieldDef::new("owner", FieldKind::Text))
                .field(FieldDef::new("priority", FieldKind::Float))
                .field(FieldDef::new("starttime", FieldKind::TimeInt))
                .field(FieldDef::new("stoptime", FieldKind::TimeInt))
                .field(FieldDef::new("filesize", FieldKind::KiloByte))
                .field(FieldDef::new("done", FieldKind::Boolean))
                .field(FieldDef::new("errors", FieldKind::Int))
                .virtual_field(VirtualDef::new(
                    "elapsed",
                    ["starttime", "stoptime"],
                    Arc::new(ElapsedSecs),
                ))
                .alias("pri", "priority")
                .where_alias("active", "not done"),
        )
        .table(
            TableDef::new("Task")
                .field(FieldDef::new("jobid", FieldKind::Int).key())
                .field(FieldDef::new("taskid", FieldKind::Int).key())
                .field(FieldDef::new("state", FieldKind::Text))
                .field(FieldDef::new("title", FieldKind::Text)),
        )
        .table(
            TableDef::new("Blade")
                .field(FieldDef::new("name", FieldKind::Text).key())
                .field(FieldDef::new("memory", FieldKind::MegaByte)),
        )
        .common_keys(["jobid", "taskid"])
        .where_alias("mine", "user=joe")
        .where_alias("loop1", "loop2 and done")
        .where_alias("loop2", "errors or loop1")
        .build();

    match schema {
        Ok(schema) => Arc::new(schema),
        Err(err) => panic!("invalid render farm schema: {err}"),
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An empty in-memory render farm database.
pub async fn setup() -> Db {
    setup_with(Config::default()).await
}

pub async fn setup_with(config: Config) -> Db {
    init_logging();

    let mut db = Db::builder()
        .schema(render_farm())
        .config(config)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    db.create_tables().await.unwrap();
    db
}

/// Like [`setup`], with every operation recorded by a [`LoggingDriver`].
pub async fn setup_logged() -> (Db, LoggingDriver) {
    init_logging();

    let driver = LoggingDriver::new(farmql_driver_sqlite::Sqlite::in_memory());
    let mut db = Db::builder()
        .schema(render_farm())
        .build(driver.clone())
        .await
        .unwrap();

    db.create_tables().await.unwrap();
    driver.clear();
    (db, driver)
}
