use farmql::{stmt::Value, Db, DbObject, Query};
use pretty_assertions::assert_eq;

fn job(db: &Db, user: &str, title: &str) -> DbObject {
    let mut job = DbObject::new(db.schema().clone(), db.table("Job").unwrap().id);
    job.set("user", user).unwrap();
    job.set("title", title).unwrap();
    job
}

#[tokio::test]
async fn insert_read_update_delete() {
    let mut db = tests::setup().await;

    let mut comp = job(&db, "joe", "comp");
    comp.set("priority", 100.0).unwrap();
    db.insert_object(&mut comp).await.unwrap();

    assert_eq!(comp.get("jobid").unwrap(), Value::I64(1));
    assert!(comp.in_database());

    let mut result = db.get_objects("Job", Query::new("user=joe")).await.unwrap();
    assert_eq!(result.len(), 1);

    let stored = result.get(0).unwrap().unwrap();
    assert_eq!(stored.get("title").unwrap(), Value::from("comp"));
    assert_eq!(stored.get("priority").unwrap(), Value::F64(100.0));
    assert!(stored.in_database());

    stored.set("priority", 250.0).unwrap();
    stored.set("done", true).unwrap();
    let mut stored = stored.clone();
    assert_eq!(db.update_object(&mut stored, None).await.unwrap(), 1);

    let mut finished = db.get_objects("Job", Query::new("done and pri > 200")).await.unwrap();
    assert_eq!(finished.len(), 1);
    let reread = finished.get(0).unwrap().unwrap();
    assert_eq!(reread.get("done").unwrap(), Value::Bool(true));
    assert_eq!(reread.get("priority").unwrap(), Value::F64(250.0));

    assert_eq!(db.delete_object(&mut stored).await.unwrap(), 1);
    assert!(!stored.in_database());
    assert_eq!(db.count_objects("Job", Query::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn booleans_survive_storage() {
    let mut db = tests::setup().await;

    let mut done = job(&db, "joe", "done");
    done.set("done", true).unwrap();
    let mut pending = job(&db, "joe", "pending");
    pending.set("done", false).unwrap();

    db.insert_object(&mut done).await.unwrap();
    db.insert_object(&mut pending).await.unwrap();
    // never assigned: stored as false
    db.insert_object(&mut job(&db, "joe", "unset")).await.unwrap();

    assert_eq!(db.count_objects("Job", Query::new("done")).await.unwrap(), 1);
    assert_eq!(db.count_objects("Job", Query::new("not done")).await.unwrap(), 2);
    assert_eq!(db.count_objects("Job", Query::new("active")).await.unwrap(), 2);

    let mut result = db
        .get_objects("Job", Query::new("").order_by(["jobid"]))
        .await
        .unwrap();
    let flags: Vec<Value> = result
        .to_objects()
        .unwrap()
        .iter_mut()
        .map(|object| object.get("done").unwrap())
        .collect();
    assert_eq!(flags, vec![Value::Bool(true), Value::Bool(false), Value::Bool(false)]);
}

#[tokio::test]
async fn order_limit_and_members() {
    let mut db = tests::setup().await;

    for (title, priority) in [("a", 10.0), ("b", 30.0), ("c", 20.0)] {
        let mut object = job(&db, "amy", title);
        object.set("priority", priority).unwrap();
        db.insert_object(&mut object).await.unwrap();
    }

    let query = Query::new("user=amy")
        .members(["title"])
        .order_by(["-priority"])
        .limit(2);
    let mut result = db.get_objects("Job", query).await.unwrap();

    let titles: Vec<Value> = result
        .to_objects()
        .unwrap()
        .iter_mut()
        .map(|object| object.get("title").unwrap())
        .collect();
    assert_eq!(titles, vec![Value::from("b"), Value::from("c")]);

    // keys are selected even when not asked for
    let first = result.get(0).unwrap().unwrap();
    assert_eq!(first.get("jobid").unwrap(), Value::I64(2));
}

#[tokio::test]
async fn counting_groups() {
    let mut db = tests::setup().await;

    for (user, title) in [("joe", "a"), ("joe", "b"), ("amy", "c")] {
        db.insert_object(&mut job(&db, user, title)).await.unwrap();
    }

    let mut groups: Vec<(String, u64)> = db
        .count_groups("Job", Query::new("").group_by(["user"]))
        .await
        .unwrap()
        .into_iter()
        .map(|(values, count)| (values[0].as_str().unwrap().to_string(), count))
        .collect();
    groups.sort();

    assert_eq!(groups, vec![("amy".to_string(), 1), ("joe".to_string(), 2)]);
}

#[tokio::test]
async fn update_and_delete_many() {
    let mut db = tests::setup().await;

    for (user, title) in [("joe", "a"), ("joe", "b"), ("amy", "c")] {
        db.insert_object(&mut job(&db, user, title)).await.unwrap();
    }

    let changed = db
        .update_objects("Job", "user=joe", &[("owner", Value::from("farm"))])
        .await
        .unwrap();
    assert_eq!(changed, 2);
    assert_eq!(db.count_objects("Job", Query::new("owner=farm")).await.unwrap(), 2);

    assert!(db.delete_objects("Job", "", false).await.is_err());
    assert_eq!(db.delete_objects("Job", "mine", false).await.unwrap(), 2);
    assert_eq!(db.count_objects("Job", Query::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn put_inserts_then_updates() {
    let mut db = tests::setup().await;

    let mut first = job(&db, "joe", "comp");
    db.put_object(&mut first, None, None).await.unwrap();
    assert_eq!(first.get("jobid").unwrap(), Value::I64(1));

    // A fresh object with the same equivalent keys finds the stored record.
    let mut second = job(&db, "joe", "comp");
    second.set("priority", 75.0).unwrap();
    db.put_object(&mut second, None, None).await.unwrap();

    assert_eq!(second.get("jobid").unwrap(), Value::I64(1));
    assert_eq!(db.count_objects("Job", Query::default()).await.unwrap(), 1);
    assert_eq!(db.count_objects("Job", Query::new("priority=75")).await.unwrap(), 1);

    let mut blade = DbObject::new(db.schema().clone(), db.table("Blade").unwrap().id);
    blade.set("name", "b01").unwrap();
    blade.set("memory", 512).unwrap();
    db.put_object(&mut blade, None, None).await.unwrap();
    assert!(db.exists_object(&blade, None, false).await.unwrap());

    blade.set("memory", 1024).unwrap();
    db.put_object(&mut blade, None, None).await.unwrap();
    assert_eq!(db.count_objects("Blade", Query::new("memory=1024")).await.unwrap(), 1);
}

#[tokio::test]
async fn object_maps() {
    let mut db = tests::setup().await;

    for (user, title) in [("joe", "a"), ("joe", "b"), ("amy", "c")] {
        db.insert_object(&mut job(&db, user, title)).await.unwrap();
    }

    let mut result = db.get_objects("Job", Query::default()).await.unwrap();

    let by_title = result.to_map(&["title"]).unwrap();
    assert_eq!(by_title.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);

    let by_user = result.to_groups(&["user"]).unwrap();
    assert_eq!(by_user["joe"].len(), 2);
    assert_eq!(by_user["amy"].len(), 1);
    assert!(result.to_map(&["user"]).is_err());
}
