use farmql::{driver::Operation, stmt::Value, Config, Db, DbObject, Query};
use pretty_assertions::assert_eq;

fn jobs(db: &Db, users: &[&str]) -> Vec<DbObject> {
    let table = db.table("Job").unwrap().id;
    users
        .iter()
        .map(|user| {
            let mut job = DbObject::new(db.schema().clone(), table);
            job.set("user", *user).unwrap();
            job
        })
        .collect()
}

async fn stored_ids(db: &mut Db) -> Vec<Value> {
    let mut result = db
        .get_objects("Job", Query::new("").members(["jobid"]).order_by(["jobid"]))
        .await
        .unwrap();

    result
        .to_objects()
        .unwrap()
        .iter_mut()
        .map(|object| object.get("jobid").unwrap())
        .collect()
}

#[tokio::test]
async fn ids_are_reserved_up_front() {
    let (mut db, driver) = tests::setup_logged().await;

    let mut objects = jobs(&db, &["joe", "amy", "bob", "sam", "ann"]);
    objects[1].set("jobid", 50).unwrap();

    let mut result = db.insert_objects("Job", objects).await.unwrap();

    let ops = driver.ops();
    assert_eq!(ops[0], Operation::reserve_ids("Job", "jobid", 4));
    assert_eq!(ops.len(), 2);

    let ids: Vec<Value> = result
        .to_objects()
        .unwrap()
        .iter()
        .map(|object| object.value("jobid").unwrap())
        .collect();
    let expected: Vec<Value> = [1, 50, 51, 52, 53].into_iter().map(Value::I64).collect();
    assert_eq!(ids, expected);
    assert_eq!(stored_ids(&mut db).await, expected);

    // single inserts continue after the highest id
    let mut next = jobs(&db, &["tim"]).remove(0);
    db.insert_object(&mut next).await.unwrap();
    assert_eq!(next.get("jobid").unwrap(), Value::I64(54));
}

#[tokio::test]
async fn reserved_ranges_do_not_overlap() {
    let mut db = tests::setup().await;

    let first = jobs(&db, &["joe", "amy"]);
    db.insert_objects("Job", first).await.unwrap();
    let second = jobs(&db, &["bob", "sam"]);
    db.insert_objects("Job", second).await.unwrap();

    let expected: Vec<Value> = (1..=4).map(Value::I64).collect();
    assert_eq!(stored_ids(&mut db).await, expected);
}

#[tokio::test]
async fn small_batches_store_every_row() {
    let mut db = tests::setup_with(Config::default().batch_insert_size(2)).await;

    let objects = jobs(&db, &["a", "b", "c", "d", "e"]);
    let result = db.insert_objects("Job", objects).await.unwrap();

    assert_eq!(result.len(), 5);
    assert_eq!(db.count_objects("Job", Query::default()).await.unwrap(), 5);
}

#[tokio::test]
async fn tables_without_auto_increment_keys() {
    let (mut db, driver) = tests::setup_logged().await;
    let task = db.table("Task").unwrap().id;

    let objects: Vec<DbObject> = (1..=3)
        .map(|taskid| {
            let mut object = DbObject::new(db.schema().clone(), task);
            object.set("jobid", 1).unwrap();
            object.set("taskid", taskid).unwrap();
            object
        })
        .collect();

    db.insert_objects("Task", objects).await.unwrap();

    assert!(driver.ops().iter().all(|op| !matches!(op, Operation::ReserveIds(_))));
    assert_eq!(db.count_objects("Task", Query::new("jobid=1")).await.unwrap(), 3);
}
