use super::Db;
use crate::{DbObject, Error, QueryResult, Result};

use farmql_core::{
    driver::Operation,
    schema::{Field, Packed, Table},
};
use farmql_sql::{stmt::Insert, Serializer, Statement};

impl Db {
    /// Inserts one object. An unset auto-increment key is filled in from
    /// the id the store assigned.
    pub async fn insert_object(&mut self, object: &mut DbObject) -> Result<()> {
        let schema = object.schema().clone();
        let table = schema.table(object.table_id());
        let columns: Vec<&Field> = table.columns().collect();

        let row = columns
            .iter()
            .map(|field| object.packed(field))
            .collect::<Result<Vec<_>>>()?;

        let auto_increment = match table.auto_increment() {
            Some(field) if object.packed(field)? == Packed::Default => Some(field),
            _ => None,
        };

        let mut insert = Insert::new(table.id, columns.iter().map(|field| field.name.clone()).collect());
        insert.rows.push(row);

        let response = self.exec(&Statement::from(insert)).await?;

        if let Some(field) = auto_increment {
            let Some(id) = response.last_insert_id else {
                return Err(Error::invalid_result(format!(
                    "the store assigned no {} to the new {} record",
                    field.member, table.name
                )));
            };
            object.set(&field.member, id)?;
        }

        object.clear_dirty();
        object.set_in_database(true);
        Ok(())
    }

    /// Inserts many objects of `table` with as few statements as the
    /// configured limits allow.
    ///
    /// Auto-increment ids are reserved up front for every object without
    /// one. An object that already carries an id keeps it, and the objects
    /// after it continue counting from there.
    pub async fn insert_objects(&mut self, table: &str, mut objects: Vec<DbObject>) -> Result<QueryResult> {
        let schema = self.schema.clone();
        let table = self.table(table)?.id;
        let table = schema.table(table);

        if let Some(object) = objects.iter().find(|object| object.table_id() != table.id) {
            return Err(Error::invalid_member(format!(
                "a {} object cannot be inserted into {}",
                object.type_name(),
                table.name
            )));
        }

        if let Some(field) = table.auto_increment() {
            self.assign_ids(table, field, &mut objects).await?;
        }

        let columns: Vec<&Field> = table.columns().collect();
        let names: Vec<String> = columns.iter().map(|field| field.name.clone()).collect();

        let serializer = Serializer::new(&schema, self.config.flavor);
        let header = format!("INSERT INTO {} ({}) VALUES ", table.name, names.join(", ")).len();

        let mut chunks: Vec<Insert> = vec![];
        let mut chunk = Insert::new(table.id, names.clone());
        let mut length = header;

        for object in &objects {
            let row = columns
                .iter()
                .map(|field| object.packed(field))
                .collect::<Result<Vec<_>>>()?;

            // "(", ")", ", " between rows and between values
            let row_length = row
                .iter()
                .map(|value| serializer.literal(value).len() + 2)
                .sum::<usize>()
                + 2;

            let full = chunk.rows.len() >= self.config.batch_insert_size
                || length + row_length > self.config.max_query_length;

            if full && !chunk.rows.is_empty() {
                chunks.push(std::mem::replace(&mut chunk, Insert::new(table.id, names.clone())));
                length = header;
            }

            chunk.rows.push(row);
            length += row_length;
        }

        if !chunk.rows.is_empty() {
            chunks.push(chunk);
        }

        let count = chunks.len();
        for (index, chunk) in chunks.into_iter().enumerate() {
            log::trace!(
                "inserting {} {} records (statement {}/{count})",
                chunk.rows.len(),
                table.name,
                index + 1
            );
            self.exec(&Statement::from(chunk)).await?;
        }

        for object in &mut objects {
            object.clear_dirty();
            object.set_in_database(true);
        }

        Ok(QueryResult::from_objects(schema.clone(), table.id, objects))
    }

    /// Gives every object without an id one from a freshly reserved range.
    async fn assign_ids(&mut self, table: &Table, field: &Field, objects: &mut [DbObject]) -> Result<()> {
        let mut unset = vec![];
        for (index, object) in objects.iter().enumerate() {
            if object.packed(field)? == Packed::Default {
                unset.push(index);
            }
        }

        if unset.is_empty() {
            return Ok(());
        }

        let response = self
            .exec_op(Operation::reserve_ids(&table.name, &field.name, unset.len() as u64))
            .await?;
        let mut next = response.into_reserved()?;

        for object in objects.iter_mut() {
            match object.packed(field)? {
                Packed::Integer(id) => next = next.max(id + 1),
                _ => {
                    object.set(&field.member, next)?;
                    next += 1;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        db::tests::{db, db_with},
        Config, DbObject,
    };

    use farmql_core::{driver::Operation, stmt::Value};

    fn job(db: &crate::Db, user: &str) -> DbObject {
        let mut job = DbObject::new(db.schema().clone(), db.table("Job").unwrap().id);
        job.set("user", user).unwrap();
        job
    }

    #[tokio::test]
    async fn single_insert_takes_the_assigned_id() {
        let (mut db, recorder) = db().await;
        let mut object = job(&db, "joe");

        db.insert_object(&mut object).await.unwrap();

        let sql = recorder.sql();
        assert!(sql[0].starts_with("INSERT INTO Job (jobid, user, title, owner,"));
        assert!(sql[0].contains("VALUES (NULL, 'joe', ''"));

        assert_eq!(object.get("jobid").unwrap(), Value::I64(1));
        assert!(object.in_database());
        assert_eq!(object.dirty().count(), 0);
    }

    #[tokio::test]
    async fn batch_reserves_ids_around_preset_ones() {
        let (mut db, recorder) = db().await;

        let mut preset = job(&db, "amy");
        preset.set("jobid", 50).unwrap();
        let objects = vec![job(&db, "joe"), preset, job(&db, "bob")];

        let mut result = db.insert_objects("Job", objects).await.unwrap();

        let ids: Vec<Value> = result
            .to_objects()
            .unwrap()
            .iter()
            .map(|object| object.value("jobid").unwrap())
            .collect();
        assert_eq!(ids, vec![Value::I64(1), Value::I64(50), Value::I64(51)]);

        let ops = recorder.ops.lock().unwrap();
        assert_eq!(ops[0], Operation::reserve_ids("Job", "jobid", 2));
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[1], Operation::ExecSql(sql) if sql.contains("(50, 'amy'")));
    }

    #[tokio::test]
    async fn batches_are_split_by_row_count() {
        let (mut db, recorder) = db_with(Config::default().batch_insert_size(2)).await;
        let objects = (0..5).map(|i| job(&db, &format!("u{i}"))).collect();

        let result = db.insert_objects("Job", objects).await.unwrap();
        assert_eq!(result.len(), 5);

        let inserts: Vec<String> = recorder
            .sql()
            .into_iter()
            .filter(|sql| sql.starts_with("INSERT"))
            .collect();
        assert_eq!(inserts.len(), 3);
        assert!(inserts[2].contains("'u4'"));
        assert!(!inserts[2].contains("'u3'"));
    }

    #[tokio::test]
    async fn batches_are_split_by_length() {
        let (mut db, recorder) = db_with(Config::default().max_query_length(10)).await;
        let objects = (0..3).map(|i| job(&db, &format!("u{i}"))).collect();

        db.insert_objects("Job", objects).await.unwrap();
        assert_eq!(recorder.sql().len(), 3);
    }

    #[tokio::test]
    async fn objects_of_other_tables_are_rejected() {
        let (mut db, recorder) = db().await;
        let blade = DbObject::new(db.schema().clone(), db.table("Blade").unwrap().id);

        let err = db.insert_objects("Job", vec![blade]).await.unwrap_err();
        assert!(err.is_invalid_member());
        assert!(recorder.ops.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_only_refuses_inserts() {
        let (mut db, _) = db_with(Config::default().read_only(true)).await;
        let mut object = job(&db, "joe");

        assert!(db.insert_object(&mut object).await.unwrap_err().is_read_only());
        assert!(!object.in_database());
    }
}
