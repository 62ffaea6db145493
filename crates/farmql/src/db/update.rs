use super::Db;
use crate::{bail, DbObject, Error, Result};

use farmql_core::{
    schema::{Field, Packed, Table},
    stmt::Value,
};
use farmql_sql::{
    stmt::{Delete, Update},
    Statement,
};

impl Db {
    /// Writes the members of `object` back to its record.
    ///
    /// Only the dirty members are written, or `members` when given. Keys
    /// identify the record and are never written. Returns the number of
    /// records changed; nothing is sent when there is nothing to write.
    pub async fn update_object(&mut self, object: &mut DbObject, members: Option<&[&str]>) -> Result<u64> {
        let schema = object.schema().clone();
        let table = schema.table(object.table_id());

        let fields: Vec<&Field> = match members {
            Some(members) => members
                .iter()
                .map(|member| own_field(table, member))
                .collect::<Result<_>>()?,
            None => object
                .dirty()
                .filter_map(|member| table.field_by_member(member))
                .collect(),
        };

        let mut assignments = vec![];
        for field in fields {
            if field.key || field.is_virtual() {
                continue;
            }
            assignments.push((field.name.clone(), object.packed(field)?));
        }

        if assignments.is_empty() {
            return Ok(0);
        }

        let filter = self.key_filter(table, object)?;
        let update = Update {
            table: table.id,
            assignments,
            filter: Some(filter),
        };

        let count = self.exec(&Statement::from(update)).await?.row_count();
        object.clear_dirty();
        Ok(count)
    }

    /// Sets members of every record of `table` matching the WHERE string
    /// `filter`. The string may only reference members of `table`.
    pub async fn update_objects(&mut self, table: &str, filter: &str, values: &[(&str, Value)]) -> Result<u64> {
        let schema = self.schema.clone();
        let table = schema.table(self.table(table)?.id);

        let filter = self.where_builder(&table.type_name)?.parse(filter)?;
        if !filter.tables().is_empty() {
            return Err(Error::join_in_update());
        }

        let mut assignments = vec![];
        for (member, value) in values {
            let field = own_field(table, member)?;
            if field.key {
                return Err(Error::key_modification(&field.member, &table.name));
            }
            if field.is_virtual() {
                return Err(Error::incorrect_type(format!(
                    "cannot assign the virtual member '{}'",
                    field.member
                )));
            }
            assignments.push((field.name.clone(), field.pack(value)?));
        }

        if assignments.is_empty() {
            return Ok(0);
        }

        let sql = filter.to_sql(self.config.flavor)?;
        let update = Update {
            table: table.id,
            assignments,
            filter: (!sql.is_empty()).then_some(sql),
        };

        Ok(self.exec(&Statement::from(update)).await?.row_count())
    }

    /// Deletes the record of `object`, found by its keys.
    pub async fn delete_object(&mut self, object: &mut DbObject) -> Result<u64> {
        let schema = object.schema().clone();
        let table = schema.table(object.table_id());

        let delete = Delete {
            table: table.id,
            filter: Some(self.key_filter(table, object)?),
        };

        let count = self.exec(&Statement::from(delete)).await?.row_count();
        object.set_in_database(false);
        Ok(count)
    }

    /// Deletes every record of `table` matching the WHERE string `filter`.
    /// An empty string deletes nothing unless `delete_all` is set.
    pub async fn delete_objects(&mut self, table: &str, filter: &str, delete_all: bool) -> Result<u64> {
        let schema = self.schema.clone();
        let table = schema.table(self.table(table)?.id);

        let filter = self.where_builder(&table.type_name)?.parse(filter)?;
        if filter.is_empty() && !delete_all {
            bail!("set delete_all to delete every {} record", table.name);
        }
        if !filter.tables().is_empty() {
            return Err(Error::join_in_delete());
        }

        let sql = filter.to_sql(self.config.flavor)?;
        let delete = Delete {
            table: table.id,
            filter: (!sql.is_empty()).then_some(sql),
        };

        Ok(self.exec(&Statement::from(delete)).await?.row_count())
    }

    /// Updates the record of `object` if it is stored, otherwise inserts it.
    ///
    /// A record without a known auto-increment id is looked up by
    /// `equiv_keys`, or the table's equivalent keys; a record found that way
    /// gives the object its id. `members` restricts what an update writes.
    pub async fn put_object(
        &mut self,
        object: &mut DbObject,
        equiv_keys: Option<&[&str]>,
        members: Option<&[&str]>,
    ) -> Result<()> {
        let schema = object.schema().clone();
        let table = schema.table(object.table_id());

        let stored = match table.auto_increment() {
            Some(field) => match self.get_id(object, equiv_keys).await? {
                Some(id) => {
                    if object.value(&field.member)?.as_i64() != Some(id) {
                        object.set(&field.member, id)?;
                    }
                    true
                }
                None => false,
            },
            None if !table.keys.is_empty() || equiv_keys.is_some() => {
                self.exists_object(object, equiv_keys, true).await?
            }
            None => false,
        };

        if stored {
            self.update_object(object, members).await?;
            object.set_in_database(true);
            Ok(())
        } else {
            self.insert_object(object).await
        }
    }

    pub async fn put_objects(&mut self, objects: &mut [DbObject], equiv_keys: Option<&[&str]>) -> Result<()> {
        for object in objects {
            self.put_object(object, equiv_keys, None).await?;
        }
        Ok(())
    }

    /// A WHERE clause body matching the record of `object` by its keys.
    fn key_filter(&self, table: &Table, object: &DbObject) -> Result<String> {
        if table.keys.is_empty() {
            bail!("{} has no keys to find a record by", table.name);
        }

        let mut keys = vec![];
        for field in table.keys() {
            let packed = object.packed(field)?;
            if matches!(packed, Packed::Null | Packed::Default) {
                bail!("the {} key '{}' is not set", table.type_name, field.member);
            }
            keys.push((field, packed));
        }

        Ok(self.match_values(keys))
    }
}

fn own_field<'t>(table: &'t Table, member: &str) -> Result<&'t Field> {
    let member = member
        .strip_prefix(table.type_name.as_str())
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(member);

    table
        .field_by_member(member)
        .ok_or_else(|| Error::invalid_member(format!("'{member}' is not a member of {}", table.type_name)))
}
