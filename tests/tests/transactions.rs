use farmql::{Db, DbObject, Query};

fn blade(db: &Db, name: &str) -> DbObject {
    let mut blade = DbObject::new(db.schema().clone(), db.table("Blade").unwrap().id);
    blade.set("name", name).unwrap();
    blade
}

#[tokio::test]
async fn rollback_discards_writes() {
    let mut db = tests::setup().await;

    db.begin().await.unwrap();
    db.insert_object(&mut blade(&db, "b01")).await.unwrap();
    db.rollback().await.unwrap();

    assert_eq!(db.count_objects("Blade", Query::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn commit_keeps_writes() {
    let mut db = tests::setup().await;

    db.begin().await.unwrap();
    db.insert_object(&mut blade(&db, "b01")).await.unwrap();
    db.insert_object(&mut blade(&db, "b02")).await.unwrap();
    db.commit().await.unwrap();

    assert_eq!(db.count_objects("Blade", Query::default()).await.unwrap(), 2);
}

#[tokio::test]
async fn duplicate_keys_are_storage_errors() {
    let mut db = tests::setup().await;

    db.insert_object(&mut blade(&db, "b01")).await.unwrap();
    let err = db.insert_object(&mut blade(&db, "b01")).await.unwrap_err();

    assert!(err.is_storage());
    assert!(err.is_duplicate_insert());
}
