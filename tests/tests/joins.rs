use farmql::{
    schema::{FieldDef, FieldKind, JoinDef, TableDef},
    stmt::Value,
    Db, DbObject, Query, Schema,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

async fn farm() -> (Db, tests::LoggingDriver) {
    let (mut db, driver) = tests::setup_logged().await;

    let mut job = DbObject::new(db.schema().clone(), db.table("Job").unwrap().id);
    job.set("user", "joe").unwrap();
    job.set("title", "comp").unwrap();
    db.insert_object(&mut job).await.unwrap();

    let task = db.table("Task").unwrap().id;
    let tasks = [(1, "finished", "render"), (2, "active", "cleanup")]
        .into_iter()
        .map(|(taskid, state, title)| {
            let mut object = DbObject::new(db.schema().clone(), task);
            object.set("jobid", 1).unwrap();
            object.set("taskid", taskid).unwrap();
            object.set("state", state).unwrap();
            object.set("title", title).unwrap();
            object
        })
        .collect();
    db.insert_objects("Task", tasks).await.unwrap();

    driver.clear();
    (db, driver)
}

#[tokio::test]
async fn external_members_add_one_join() {
    let (mut db, driver) = farm().await;

    let query = Query::new("Task.state=finished").members(["title", "Task.taskid"]);
    let mut result = db.get_objects("Job", query).await.unwrap();

    let sql = driver.sql();
    assert_eq!(sql.len(), 1);
    assert_eq!(sql[0].matches(" LEFT JOIN Task ON (Job.jobid=Task.jobid)").count(), 1);

    assert_eq!(result.len(), 1);
    let job = result.get(0).unwrap().unwrap();
    assert_eq!(job.get("title").unwrap(), Value::from("comp"));

    let task = job.ext("Task").unwrap();
    assert_eq!(task.value("taskid").unwrap(), Value::I64(1));
    assert_eq!(task.value("jobid").unwrap(), Value::I64(1));
}

#[tokio::test]
async fn one_row_per_joined_record() {
    let (mut db, _) = farm().await;

    let query = Query::new("").members(["title", "Task.state"]).order_by(["Task.taskid"]);
    let mut result = db.get_objects("Job", query).await.unwrap();
    assert_eq!(result.len(), 2);

    let states: Vec<Value> = result
        .to_objects()
        .unwrap()
        .iter()
        .map(|job| job.ext("Task").unwrap().value("state").unwrap())
        .collect();
    assert_eq!(states, vec![Value::from("finished"), Value::from("active")]);
}

#[tokio::test]
async fn joins_are_refused_when_writing() {
    let (mut db, driver) = farm().await;

    let err = db
        .update_objects("Job", "Task.state=active", &[("priority", Value::F64(1.0))])
        .await
        .unwrap_err();
    assert!(err.is_join());

    let err = db.delete_objects("Job", "Task.state=active", false).await.unwrap_err();
    assert!(err.is_join());

    let err = db
        .update_objects("Job", "user=joe", &[("jobid", Value::I64(9))])
        .await
        .unwrap_err();
    assert!(err.is_key_modification());

    assert!(driver.ops().is_empty());
}

/// Blades are only reachable from Job through the task that ran on them.
async fn farm_with_blades() -> (Db, tests::LoggingDriver) {
    tests::init_logging();

    let schema = Schema::builder()
        .table(
            TableDef::new("Job")
                .field(FieldDef::new("jobid", FieldKind::AutoInc).key())
                .field(FieldDef::new("title", FieldKind::Text)),
        )
        .table(
            TableDef::new("Task")
                .field(FieldDef::new("jobid", FieldKind::Int).key())
                .field(FieldDef::new("taskid", FieldKind::Int).key())
                .field(FieldDef::new("blade", FieldKind::Text)),
        )
        .table(
            TableDef::new("Blade")
                .field(FieldDef::new("name", FieldKind::Text).key())
                .field(FieldDef::new("memory", FieldKind::Int)),
        )
        .common_keys(["jobid", "taskid"])
        .join(JoinDef::new("Job", "Blade", "Blade.name=Task.blade").pre_tables(["Task"]))
        .build()
        .unwrap();

    let driver = tests::LoggingDriver::new(farmql_driver_sqlite::Sqlite::in_memory());
    let mut db = Db::builder()
        .schema(Arc::new(schema))
        .build(driver.clone())
        .await
        .unwrap();
    db.create_tables().await.unwrap();

    let mut job = DbObject::new(db.schema().clone(), db.table("Job").unwrap().id);
    job.set("title", "comp").unwrap();
    db.insert_object(&mut job).await.unwrap();

    let task = db.table("Task").unwrap().id;
    let tasks = [(1, "b1"), (2, "b2")]
        .into_iter()
        .map(|(taskid, blade)| {
            let mut object = DbObject::new(db.schema().clone(), task);
            object.set("jobid", 1).unwrap();
            object.set("taskid", taskid).unwrap();
            object.set("blade", blade).unwrap();
            object
        })
        .collect();
    db.insert_objects("Task", tasks).await.unwrap();

    let blade = db.table("Blade").unwrap().id;
    let blades = [("b1", 4096), ("b2", 512)]
        .into_iter()
        .map(|(name, memory)| {
            let mut object = DbObject::new(db.schema().clone(), blade);
            object.set("name", name).unwrap();
            object.set("memory", memory).unwrap();
            object
        })
        .collect();
    db.insert_objects("Blade", blades).await.unwrap();

    driver.clear();
    (db, driver)
}

#[tokio::test]
async fn prerequisite_tables_are_joined_first() {
    let (mut db, driver) = farm_with_blades().await;

    let query = Query::new("Blade.memory > 1000").members(["title", "Blade.name"]);
    let mut result = db.get_objects("Job", query).await.unwrap();

    let sql = driver.sql();
    assert_eq!(sql.len(), 1);
    assert!(
        sql[0].contains(" LEFT JOIN Task ON (Job.jobid=Task.jobid) LEFT JOIN Blade ON (Blade.name=Task.blade)"),
        "{}",
        sql[0]
    );

    assert_eq!(result.len(), 1);
    let job = result.get(0).unwrap().unwrap();
    assert_eq!(job.get("title").unwrap(), Value::from("comp"));
    assert_eq!(job.ext("Blade").unwrap().value("name").unwrap(), Value::from("b1"));
}
