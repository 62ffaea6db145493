use super::{Db, Query};
use crate::{DbObject, Error, QueryResult, Result, Where};

use farmql_core::{
    driver::Row,
    schema::{Field, FieldId, Packed, Table, TableId},
    stmt::Value,
    Schema,
};
use farmql_sql::{
    stmt::{self, OrderBy, Select, SelectColumn},
    Statement,
};

impl Db {
    /// The SELECT statement `query` runs against `table`.
    pub fn select_sql(&self, table: &str, query: &Query) -> Result<String> {
        let (select, _) = self.build_select(table, query, false)?;
        Ok(self.serializer().serialize(&Statement::Select(select)))
    }

    /// Reads the objects of `table` matching `query`.
    pub async fn get_objects(&mut self, table: &str, query: Query) -> Result<QueryResult> {
        let (select, members) = self.build_select(table, &query, false)?;
        let primary = select.primary;

        let rows = self.exec(&select.into()).await?.into_values()?;
        log::trace!("read {} rows from {table}", rows.len());

        Ok(QueryResult::new(self.schema.clone(), primary, members, rows)
            .cache_objects(self.config.cache_objects))
    }

    /// Number of objects of `table` matching `query`.
    pub async fn count_objects(&mut self, table: &str, query: Query) -> Result<u64> {
        let (select, _) = self.build_select(table, &query, true)?;
        let rows = self.exec(&select.into()).await?.into_values()?;
        row_count(rows.first())
    }

    /// Number of matching objects for each distinct value of the query's
    /// `group_by` members.
    pub async fn count_groups(&mut self, table: &str, query: Query) -> Result<Vec<(Vec<Value>, u64)>> {
        if query.group_by.is_empty() {
            return Err(Error::invalid_member("counting groups needs group_by members"));
        }

        let (mut select, _) = self.build_select(table, &query, false)?;
        let primary = select.primary;

        let schema = self.schema.clone();
        let groups: Vec<&Field> = query
            .group_by
            .iter()
            .map(|name| find_member(&schema, primary, name))
            .collect::<Result<_>>()?;

        select.columns = groups.iter().map(|field| SelectColumn::Field(field.id)).collect();
        select.columns.push(SelectColumn::Expr {
            sql: "COUNT(*)".to_string(),
            alias: "rowcount".to_string(),
        });

        let rows = self.exec(&select.into()).await?.into_values()?;

        rows.iter()
            .map(|row| {
                let values = groups
                    .iter()
                    .map(|field| {
                        let column = column_name(field, primary);
                        match row.get(&column) {
                            Some(stored) => field.unpack(stored),
                            None => Ok(Value::Null),
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok((values, row_count(Some(row))?))
            })
            .collect()
    }

    /// The auto-increment id of the record `object` stands for.
    ///
    /// An id already set on the object is returned as is. Otherwise the
    /// record is looked up by `equiv_keys`, or the table's equivalent keys
    /// when `None`. Returns `None` when no record matches.
    pub async fn get_id(&mut self, object: &DbObject, equiv_keys: Option<&[&str]>) -> Result<Option<i64>> {
        let table = object.table();
        let Some(id_field) = table.auto_increment() else {
            return Err(Error::invalid_schema(format!(
                "table {} has no auto increment key",
                table.name
            )));
        };

        if let Some(id) = object.value(&id_field.member)?.as_i64().filter(|id| *id > 0) {
            return Ok(Some(id));
        }

        let lookup = self.equiv_fields(table, equiv_keys)?;
        if lookup.is_empty() {
            return Ok(None);
        }

        let filter = self.match_values(
            lookup
                .iter()
                .map(|field| Ok((*field, object.packed(field)?)))
                .collect::<Result<Vec<_>>>()?,
        );

        let mut select = Select::new(table.id);
        select.columns.push(SelectColumn::Field(id_field.id));
        select.filter = Some(filter);

        let rows = self.exec(&select.into()).await?.into_values()?;
        match rows.as_slice() {
            [] => Ok(None),
            [row] => Ok(row.get(&id_field.select_name).and_then(Value::as_i64)),
            rows => Err(Error::too_many_records(
                &table.name,
                rows.len(),
                describe(object, &lookup),
            )),
        }
    }

    /// True if the record `object` stands for is stored.
    ///
    /// With `fast`, an object read from the store or carrying an
    /// auto-increment id is assumed to exist without asking the store.
    pub async fn exists_object(
        &mut self,
        object: &DbObject,
        equiv_keys: Option<&[&str]>,
        fast: bool,
    ) -> Result<bool> {
        if fast && object.in_database() {
            return Ok(true);
        }

        let table = object.table();
        let id_set = match table.auto_increment() {
            Some(field) => object.value(&field.member)?.as_i64().is_some_and(|id| id > 0),
            None => false,
        };

        if fast && id_set {
            return Ok(true);
        }

        let lookup: Vec<&Field> = match equiv_keys {
            Some(_) => self.equiv_fields(table, equiv_keys)?,
            None if !id_set && !table.equiv_keys.is_empty() => table.equiv_keys().collect(),
            None => table.keys().collect(),
        };

        if lookup.is_empty() {
            return Ok(false);
        }

        let mut values = vec![];
        for field in &lookup {
            let packed = object.packed(field)?;
            if matches!(packed, Packed::Null | Packed::Default) {
                return Ok(false);
            }
            values.push((*field, packed));
        }

        let mut select = Select::new(table.id);
        select.count = true;
        select.filter = Some(self.match_values(values));

        let rows = self.exec(&select.into()).await?.into_values()?;
        match row_count(rows.first())? {
            0 => Ok(false),
            1 => Ok(true),
            count => Err(Error::too_many_records(&table.name, count as usize, describe(object, &lookup))),
        }
    }

    /// Builds the SELECT for `query` and lists the members each object of
    /// the result carries.
    pub(crate) fn build_select(&self, table: &str, query: &Query, count: bool) -> Result<(Select, Vec<FieldId>)> {
        let table = self.table(table)?;
        let primary = table.id;

        let filter = self.query_filter(table, query)?;

        let mut members: Vec<FieldId> = vec![];
        for member in &query.members {
            for field in self.expand(primary, member)? {
                push(&mut members, field.id);
            }
        }

        if !members.iter().any(|id| id.table == primary) {
            let mut all: Vec<FieldId> = table.columns().map(|field| field.id).collect();
            if query.members.is_empty() && self.config.virtual_fields {
                all.extend(table.fields.iter().filter(|f| f.is_virtual()).map(|f| f.id));
            }
            for id in members {
                push(&mut all, id);
            }
            members = all;
        }

        for member in &query.not_members {
            let removed: Vec<FieldId> = self.expand(primary, member)?.iter().map(|f| f.id).collect();
            members.retain(|id| !removed.contains(id));
        }

        // Stored columns: the members, the fields virtual members are
        // computed from, and whatever identifies each object.
        let mut columns: Vec<FieldId> = vec![];
        for id in &members {
            let field = self.schema.field(*id);
            if field.is_virtual() {
                if self.config.virtual_fields {
                    for dependent in self.dependents(field)? {
                        push(&mut columns, dependent.id);
                    }
                }
            } else {
                push(&mut columns, *id);
            }
        }

        let mut tables: Vec<TableId> = vec![primary];
        for id in &columns {
            push(&mut tables, id.table);
        }
        for id in filter.tables() {
            push(&mut tables, id);
        }

        let order_by: Vec<(&Field, stmt::Direction)> = query
            .order_by
            .iter()
            .map(|(member, direction)| Ok((find_member(&self.schema, primary, member)?, *direction)))
            .collect::<Result<_>>()?;
        let group_by: Vec<&Field> = query
            .group_by
            .iter()
            .map(|member| find_member(&self.schema, primary, member))
            .collect::<Result<_>>()?;

        for field in order_by.iter().map(|(field, _)| *field).chain(group_by.iter().copied()) {
            push(&mut tables, field.table());
        }

        for id in &tables {
            let table = self.schema.table(*id);
            for field in table.keys().chain(table.discriminator()) {
                push(&mut columns, field.id);
            }
        }

        let joins = self.schema.join_path(primary, &tables)?;

        let mut select = Select::new(primary);
        select.count = count;
        select.columns = columns.into_iter().map(SelectColumn::Field).collect();
        select.joins = joins
            .into_iter()
            .map(|join| stmt::Join {
                table: join.right,
                on: join.on.clone(),
                left_join: join.left_join,
            })
            .collect();

        let sql = filter.to_sql(self.config.flavor)?;
        if !sql.is_empty() {
            select.filter = Some(sql);
        }
        select.where_args = query.where_args.clone();

        select.group_by = group_by
            .iter()
            .map(|field| self.sort_expr(field))
            .collect::<Result<_>>()?;
        select.order_by = order_by
            .iter()
            .map(|(field, direction)| {
                Ok(OrderBy {
                    expr: self.sort_expr(field)?,
                    direction: *direction,
                })
            })
            .collect::<Result<_>>()?;

        select.limit = query.limit;
        select.offset = query.offset;

        Ok((select, members))
    }

    pub(crate) fn query_filter(&self, table: &Table, query: &Query) -> Result<Where> {
        let mut builder = self.where_builder(&table.type_name)?;
        for (name, text) in &query.aliases {
            builder = builder.alias(name, text);
        }
        builder.parse(&query.filter)
    }

    /// Resolves a member reference, or every field of a table for `Type.*`.
    fn expand(&self, primary: TableId, member: &str) -> Result<Vec<&Field>> {
        if let Some(name) = member.strip_suffix(".*") {
            let table = self.table(name)?;
            return Ok(table.columns().collect());
        }
        Ok(vec![find_member(&self.schema, primary, member)?])
    }

    fn dependents<'f>(&'f self, field: &Field) -> Result<Vec<&'f Field>> {
        let table = self.schema.table(field.table());
        field
            .dependents
            .iter()
            .map(|member| {
                table.field_by_member(member).ok_or_else(|| {
                    Error::invalid_schema(format!(
                        "'{}' depends on unknown member '{member}'",
                        field.member
                    ))
                })
            })
            .collect()
    }

    /// The SQL expression a member sorts and groups by.
    fn sort_expr(&self, field: &Field) -> Result<String> {
        if !field.is_virtual() {
            return Ok(field.qualified_name());
        }

        let columns: Vec<String> = self
            .dependents(field)?
            .into_iter()
            .map(Field::qualified_name)
            .collect();

        field
            .virtual_field
            .as_ref()
            .and_then(|behavior| behavior.select(&columns))
            .ok_or_else(|| {
                Error::invalid_member(format!("cannot sort or group by '{}'", field.member))
            })
    }

    /// The fields a record is looked up by when its id is unknown.
    fn equiv_fields<'t>(&self, table: &'t Table, members: Option<&[&str]>) -> Result<Vec<&'t Field>> {
        match members {
            None => Ok(table.equiv_keys().collect()),
            Some(members) => members
                .iter()
                .map(|member| {
                    table.field_by_member(member).ok_or_else(|| {
                        Error::invalid_member(format!(
                            "'{member}' is not a member of {}",
                            table.type_name
                        ))
                    })
                })
                .collect(),
        }
    }
}

fn find_member<'s>(schema: &'s Schema, primary: TableId, member: &str) -> Result<&'s Field> {
    schema.field_by_member(member, Some(primary)).ok_or_else(|| {
        Error::invalid_member(format!("'{member}' does not map to a valid member"))
    })
}

fn push<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// Key of a column in result rows.
fn column_name(field: &Field, primary: TableId) -> String {
    if field.table() == primary {
        field.select_name.clone()
    } else {
        format!("{}.{}", field.type_name, field.select_name)
    }
}

fn row_count(row: Option<&Row>) -> Result<u64> {
    row.and_then(|row| row.get("rowcount"))
        .and_then(Value::as_i64)
        .map(|count| count.max(0) as u64)
        .ok_or_else(|| Error::invalid_result("count query returned no rowcount"))
}

fn describe(object: &DbObject, fields: &[&Field]) -> String {
    fields
        .iter()
        .map(|field| {
            let value = object.value(&field.member).unwrap_or_default();
            format!("{}={}", field.member, value.to_text())
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::tests::{db, db_with, row},
        Config,
    };

    use farmql_core::driver::Operation;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn selects_all_columns_by_default() {
        let (db, _) = db().await;
        let sql = db.select_sql("Job", &Query::new("")).unwrap();
        assert!(sql.starts_with("SELECT jobid, user, title, owner, priority,"));
        assert!(sql.ends_with(" FROM Job;"));
    }

    #[tokio::test]
    async fn where_order_and_limit() {
        let (db, _) = db().await;
        let query = Query::new("priority > 300 and user=thing")
            .members(["title"])
            .where_arg("Job.errors=0")
            .order_by(["-priority", "jobid"])
            .limit(10)
            .offset(20);

        assert_eq!(
            db.select_sql("Job", &query).unwrap(),
            "SELECT title, jobid FROM Job \
             WHERE (Job.priority > 300 AND Job.user='thing') AND Job.errors=0 \
             ORDER BY Job.priority DESC, Job.jobid LIMIT 10 OFFSET 20;"
        );
    }

    #[tokio::test]
    async fn external_members_join_their_table() {
        let (db, _) = db().await;
        let query = Query::new("Task.state=finished").members(["Task.title"]);
        let sql = db.select_sql("Job", &query).unwrap();

        // No primary member was asked for, so the whole object is selected.
        assert!(sql.starts_with("SELECT Job.jobid AS jobid, Job.user AS user,"));
        assert!(sql.contains("Task.title AS \"Task.title\""));
        assert!(sql.contains("Task.taskid AS \"Task.taskid\""));
        assert!(sql.contains(" FROM Job LEFT JOIN Task ON (Job.jobid=Task.jobid)"));
        assert!(sql.contains("WHERE (Task.state='finished')"));
    }

    #[tokio::test]
    async fn not_members_are_left_out() {
        let (db, _) = db().await;
        let query = Query::new("").not_members(["metadata", "crews"]);
        let sql = db.select_sql("Job", &query).unwrap();
        assert!(!sql.contains("metadata"));
        assert!(!sql.contains("crews"));
        assert!(sql.contains("jobid"));
    }

    #[tokio::test]
    async fn virtual_members_select_their_dependents() {
        let (db, _) = db().await;
        let sql = db
            .select_sql("Job", &Query::new("").members(["user", "elapsed"]))
            .unwrap();
        assert_eq!(sql, "SELECT user, starttime, stoptime, jobid FROM Job;");

        let sql = db
            .select_sql("Job", &Query::new("").members(["user"]).order_by(["-elapsed"]))
            .unwrap();
        assert!(sql.contains("ORDER BY (CASE WHEN Job.starttime>0"));
        assert!(sql.ends_with(" DESC;"));
    }

    #[tokio::test]
    async fn unknown_members_are_rejected() {
        let (db, _) = db().await;
        let err = db.select_sql("Job", &Query::new("").members(["nope"])).unwrap_err();
        assert!(err.is_invalid_member());

        let err = db.select_sql("Job", &Query::new("").order_by(["nope"])).unwrap_err();
        assert!(err.is_invalid_member());
    }

    #[tokio::test]
    async fn query_aliases() {
        let (db, _) = db().await;
        let query = Query::new("late").members(["jobid"]).alias("late", "priority < 10");
        assert_eq!(
            db.select_sql("Job", &query).unwrap(),
            "SELECT jobid FROM Job WHERE ((Job.priority < 10));"
        );
    }

    #[tokio::test]
    async fn get_objects_materializes_rows() {
        let (mut db, recorder) = db().await;
        recorder.push_rows(vec![
            row(&[("jobid", 1.into()), ("user", "joe".into()), ("priority", 400.0.into())]),
            row(&[("jobid", 2.into()), ("user", "amy".into()), ("priority", 100.0.into())]),
        ]);

        let query = Query::new("priority > 50").members(["user", "priority"]);
        let mut result = db.get_objects("Job", query).await.unwrap();

        assert_eq!(result.len(), 2);
        let job = result.get(0).unwrap().unwrap();
        assert_eq!(job.get("user").unwrap(), Value::from("joe"));
        assert!(job.in_database());

        let ops = recorder.ops.lock().unwrap();
        assert!(matches!(&ops[0], Operation::QuerySql(sql) if sql.starts_with("SELECT user, priority, jobid")));
    }

    #[tokio::test]
    async fn counting() {
        let (mut db, recorder) = db().await;
        recorder.push_rows(vec![row(&[("rowcount", 7.into())])]);

        let count = db.count_objects("Job", Query::new("not done")).await.unwrap();
        assert_eq!(count, 7);
        assert!(recorder.sql()[0].starts_with("SELECT COUNT(*) AS rowcount FROM Job WHERE ("));
    }

    #[tokio::test]
    async fn counting_groups() {
        let (mut db, recorder) = db().await;
        recorder.push_rows(vec![
            row(&[("user", "amy".into()), ("rowcount", 3.into())]),
            row(&[("user", "joe".into()), ("rowcount", 1.into())]),
        ]);

        let groups = db
            .count_groups("Job", Query::new("").group_by(["user"]))
            .await
            .unwrap();
        assert_eq!(groups, vec![(vec![Value::from("amy")], 3), (vec![Value::from("joe")], 1)]);
        assert_eq!(
            recorder.sql()[0],
            "SELECT user, COUNT(*) AS rowcount FROM Job GROUP BY Job.user;"
        );
    }

    #[tokio::test]
    async fn get_id_uses_a_set_id_without_a_query() {
        let (mut db, recorder) = db().await;
        let mut job = DbObject::new(db.schema().clone(), db.table("Job").unwrap().id);
        job.set("jobid", 12).unwrap();

        assert_eq!(db.get_id(&job, None).await.unwrap(), Some(12));
        assert!(recorder.ops.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_id_looks_up_equivalent_keys() {
        let (mut db, recorder) = db().await;
        let mut job = DbObject::new(db.schema().clone(), db.table("Job").unwrap().id);
        job.set("user", "joe").unwrap();
        job.set("title", "comp").unwrap();

        recorder.push_rows(vec![row(&[("jobid", 5.into())])]);
        assert_eq!(db.get_id(&job, None).await.unwrap(), Some(5));
        assert_eq!(
            recorder.sql()[0],
            "SELECT jobid FROM Job WHERE (Job.user='joe' AND Job.title='comp');"
        );

        recorder.push_rows(vec![row(&[("jobid", 5.into())]), row(&[("jobid", 6.into())])]);
        let err = db.get_id(&job, None).await.unwrap_err();
        assert!(err.is_too_many_records());

        assert_eq!(db.get_id(&job, None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn exists_object_paths() {
        let (mut db, recorder) = db_with(Config::default()).await;
        let task_table = db.table("Task").unwrap().id;

        let mut task = DbObject::new(db.schema().clone(), task_table);
        task.set("jobid", 1).unwrap();
        task.set("taskid", 2).unwrap();

        recorder.push_rows(vec![row(&[("rowcount", 1.into())])]);
        assert!(db.exists_object(&task, None, true).await.unwrap());
        assert_eq!(
            recorder.sql()[0],
            "SELECT COUNT(*) AS rowcount FROM Task WHERE (Task.jobid=1 AND Task.taskid=2);"
        );

        recorder.push_rows(vec![row(&[("rowcount", 2.into())])]);
        let err = db.exists_object(&task, Some(&["jobid"]), false).await.unwrap_err();
        assert!(err.is_too_many_records());

        let mut job = DbObject::new(db.schema().clone(), db.table("Job").unwrap().id);
        job.set("jobid", 3).unwrap();
        assert!(db.exists_object(&job, None, true).await.unwrap());
        assert_eq!(recorder.sql().len(), 2);
    }
}
