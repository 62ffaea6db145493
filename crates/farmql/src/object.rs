use crate::{Error, Result};

use farmql_core::{
    driver::Row,
    schema::{Field, Packed, Table, TableId},
    stmt::{ExprMember, Input, Value},
    Schema,
};
use indexmap::{IndexMap, IndexSet};
use std::{fmt, sync::Arc};

/// How much of the row an object was read from has been unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    /// No member has been read yet.
    Raw,
    PartiallyUnpacked,

    /// Every selected column has been converted to its member value. Objects
    /// built in memory start here.
    FullyUnpacked,
}

/// A record of a table, either built in memory or read from a row.
///
/// Members are read with [`get`](DbObject::get) and written with
/// [`set`](DbObject::set). Columns of a row are only unpacked when their
/// member is first read, and members that were not selected read as the
/// field default.
#[derive(Clone)]
pub struct DbObject {
    schema: Arc<Schema>,
    table: TableId,

    /// The type of the object, the base type of the table or a subtype.
    type_name: String,

    /// Selected columns not yet converted, keyed by select name.
    raw: Row,

    /// Unpacked and assigned member values.
    values: IndexMap<String, Value>,

    dirty: IndexSet<String>,

    in_database: bool,

    /// Objects of joined tables read from the same row, by type name.
    ext: IndexMap<String, Arc<DbObject>>,
}

impl DbObject {
    /// Creates an object of the base type of `table` with every member at its
    /// default.
    pub fn new(schema: Arc<Schema>, table: TableId) -> DbObject {
        let type_name = schema.table(table).type_name.clone();
        DbObject::from_parts(schema, table, type_name, Row::new(), false)
    }

    /// Creates an object of a subtype of `table`.
    pub fn of_type(schema: Arc<Schema>, table: TableId, type_name: &str) -> Result<DbObject> {
        let table_ref = schema.table(table);
        if !table_ref.has_type(type_name) {
            return Err(Error::invalid_member(format!(
                "'{type_name}' is not a type of {}",
                table_ref.name
            )));
        }

        let mut object = DbObject::from_parts(schema.clone(), table, type_name.to_string(), Row::new(), false);
        if let Some(discriminator) = schema.table(table).discriminator() {
            object
                .values
                .insert(discriminator.member.clone(), Value::from(type_name));
        }
        Ok(object)
    }

    /// Wraps a row read from storage. `raw` is keyed by select name.
    pub(crate) fn from_row(schema: Arc<Schema>, table: TableId, type_name: String, raw: Row) -> DbObject {
        DbObject::from_parts(schema, table, type_name, raw, true)
    }

    fn from_parts(
        schema: Arc<Schema>,
        table: TableId,
        type_name: String,
        raw: Row,
        in_database: bool,
    ) -> DbObject {
        DbObject {
            schema,
            table,
            type_name,
            raw,
            values: IndexMap::new(),
            dirty: IndexSet::new(),
            in_database,
            ext: IndexMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn table(&self) -> &Table {
        self.schema.table(self.table)
    }

    pub fn table_id(&self) -> TableId {
        self.table
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// True once the object was read from, or written to, storage.
    pub fn in_database(&self) -> bool {
        self.in_database
    }

    pub(crate) fn set_in_database(&mut self, in_database: bool) {
        self.in_database = in_database;
    }

    /// Member names of the object's type, in declaration order.
    pub fn members(&self) -> Vec<&str> {
        self.table()
            .fields_of(&self.type_name)
            .map(|field| field.member.as_str())
            .collect()
    }

    /// Reads a member, unpacking its column on first access.
    ///
    /// `Type.member` reads a member of a joined object.
    pub fn get(&mut self, member: &str) -> Result<Value> {
        let schema = self.schema.clone();

        let field = match self.resolve(&schema, member)? {
            Resolved::Own(field) => field,
            Resolved::Ext(type_name, member) => return self.ext_value(type_name, member),
        };

        if field.is_virtual() {
            return self.virtual_value(field);
        }

        if let Some(value) = self.values.get(&field.member) {
            return Ok(value.clone());
        }

        match self.raw.get(&field.select_name) {
            Some(stored) => {
                let value = field.unpack(stored)?;
                self.values.insert(field.member.clone(), value.clone());
                Ok(value)
            }
            None => Ok(field.default.clone()),
        }
    }

    /// Reads a member without remembering the unpacked value.
    pub fn value(&self, member: &str) -> Result<Value> {
        match self.resolve(&self.schema, member)? {
            Resolved::Own(field) if field.is_virtual() => self.virtual_value(field),
            Resolved::Own(field) => self.load(field),
            Resolved::Ext(type_name, member) => self.ext_value(type_name, member),
        }
    }

    /// Assigns a member and marks it dirty.
    ///
    /// The value must pack into the field's storage type. Key members cannot
    /// change once the object is in the database.
    pub fn set(&mut self, member: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let schema = self.schema.clone();

        let Resolved::Own(field) = self.resolve(&schema, member)? else {
            return Err(Error::invalid_member(format!(
                "'{member}' belongs to a joined object"
            )));
        };

        if field.is_virtual() {
            return Err(Error::incorrect_type(format!(
                "cannot assign the virtual member '{}'",
                field.member
            )));
        }

        if field.key && self.in_database && self.load(field)? != value {
            return Err(Error::key_modification(&field.member, &self.type_name));
        }

        field.pack(&value)?;

        self.raw.shift_remove(&field.select_name);
        self.values.insert(field.member.clone(), value);
        self.dirty.insert(field.member.clone());
        Ok(())
    }

    pub fn state(&self) -> ObjectState {
        let table = self.table();
        let mut unpacked = 0;
        let mut pending = 0;

        for column in self.raw.keys() {
            let Some(field) = table.field_by_select_name(column) else {
                continue;
            };
            if self.values.contains_key(&field.member) {
                unpacked += 1;
            } else {
                pending += 1;
            }
        }

        match (unpacked, pending) {
            (_, 0) => ObjectState::FullyUnpacked,
            (0, _) => ObjectState::Raw,
            _ => ObjectState::PartiallyUnpacked,
        }
    }

    /// Unpacks every selected column.
    pub fn unpack_all(&mut self) -> Result<()> {
        let schema = self.schema.clone();
        let table = schema.table(self.table);

        for field in table.fields_of(&self.type_name) {
            if field.is_virtual() || self.values.contains_key(&field.member) {
                continue;
            }
            if let Some(stored) = self.raw.get(&field.select_name) {
                let value = field.unpack(stored)?;
                self.values.insert(field.member.clone(), value);
            }
        }

        Ok(())
    }

    pub fn is_dirty(&self, member: &str) -> bool {
        self.dirty.contains(member)
    }

    /// Members assigned since the object was read or last stored.
    pub fn dirty(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Marks a member as modified without assigning it.
    pub fn make_dirty(&mut self, member: &str) -> Result<()> {
        let schema = self.schema.clone();
        match self.resolve(&schema, member)? {
            Resolved::Own(field) if !field.is_virtual() => {
                self.dirty.insert(field.member.clone());
                Ok(())
            }
            _ => Err(Error::invalid_member(format!(
                "'{member}' has no storage in {}",
                self.type_name
            ))),
        }
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Values of the primary key members.
    pub fn key(&self) -> Result<Vec<Value>> {
        self.table().keys().map(|field| self.load(field)).collect()
    }

    /// Values of the equivalent key members.
    pub fn equiv_key(&self) -> Result<Vec<Value>> {
        self.table().equiv_keys().map(|field| self.load(field)).collect()
    }

    /// The joined object of type `type_name` read from the same row.
    pub fn ext(&self, type_name: &str) -> Option<&DbObject> {
        self.ext.get(type_name).map(|ext| &**ext)
    }

    pub(crate) fn attach(&mut self, ext: Arc<DbObject>) {
        self.ext.insert(ext.table().type_name.clone(), ext);
    }

    /// The storage representation of a member.
    pub(crate) fn packed(&self, field: &Field) -> Result<Packed> {
        field.pack(&self.load(field)?)
    }

    /// Every member value of the object's type, unpacking as needed.
    pub fn to_values(&self) -> Result<IndexMap<String, Value>> {
        self.table()
            .fields_of(&self.type_name)
            .map(|field| Ok((field.member.clone(), self.value(&field.member)?)))
            .collect()
    }

    fn load(&self, field: &Field) -> Result<Value> {
        if let Some(value) = self.values.get(&field.member) {
            return Ok(value.clone());
        }

        match self.raw.get(&field.select_name) {
            Some(stored) => field.unpack(stored),
            None => Ok(field.default.clone()),
        }
    }

    fn virtual_value(&self, field: &Field) -> Result<Value> {
        let Some(behavior) = &field.virtual_field else {
            return Err(Error::invalid_schema(format!(
                "'{}' has no behavior",
                field.member
            )));
        };

        let dependents = field
            .dependents
            .iter()
            .map(|member| self.value(member))
            .collect::<Result<Vec<_>>>()?;

        Ok(behavior.value(&dependents, chrono::Local::now().timestamp()))
    }

    fn ext_value(&self, type_name: &str, member: &str) -> Result<Value> {
        match self.ext.get(type_name) {
            Some(ext) => ext.value(member),
            None => Err(Error::no_member_found(format!(
                "'{type_name}.{member}' was not selected"
            ))),
        }
    }

    fn resolve<'s, 'm>(&self, schema: &'s Schema, member: &'m str) -> Result<Resolved<'s, 'm>> {
        let table = schema.table(self.table);

        let member = match member.split_once('.') {
            Some((type_name, member)) if table.has_type(type_name) => member,
            Some((type_name, member)) => {
                return match schema.table_by_name(type_name) {
                    Some(other) if other.id != self.table => Ok(Resolved::Ext(type_name, member)),
                    _ => Err(Error::invalid_member(format!("unknown type '{type_name}'"))),
                };
            }
            None => member,
        };

        let field = table.field_by_member(member).ok_or_else(|| {
            Error::no_member_found(format!("'{member}' is not a member of {}", self.type_name))
        })?;

        let visible = match &field.subtype {
            None => true,
            Some(subtype) => table.lineage(&self.type_name).contains(&subtype.as_str()),
        };

        if !visible {
            return Err(Error::no_member_found(format!(
                "'{member}' is not a member of {}",
                self.type_name
            )));
        }

        Ok(Resolved::Own(field))
    }
}

enum Resolved<'s, 'm> {
    Own(&'s Field),
    Ext(&'m str, &'m str),
}

/// Members of other tables are read from the joined objects.
impl Input for DbObject {
    fn member(&mut self, member: &ExprMember) -> Result<Value> {
        if self.table().has_type(&member.table) {
            self.get(&member.member)
        } else {
            self.ext_value(&member.table, &member.member)
        }
    }
}

impl fmt::Debug for DbObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbObject")
            .field("type_name", &self.type_name)
            .field("in_database", &self.in_database)
            .field("values", &self.values)
            .field("raw", &self.raw)
            .field("dirty", &self.dirty)
            .field("ext", &self.ext.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn job_row(pairs: &[(&str, Value)]) -> DbObject {
        let schema = fixtures::render_farm();
        let job = schema.table_by_name("Job").unwrap().id;
        let raw = pairs
            .iter()
            .map(|(column, value)| (column.to_string(), value.clone()))
            .collect();
        DbObject::from_row(schema, job, "Job".to_string(), raw)
    }

    #[test]
    fn unpacks_lazily() {
        let mut job = job_row(&[
            ("jobid", Value::I64(7)),
            ("done", Value::from("t")),
            ("crews", Value::from("lgt,fx")),
        ]);
        assert_eq!(job.state(), ObjectState::Raw);

        assert_eq!(job.get("done").unwrap(), Value::Bool(true));
        assert_eq!(job.state(), ObjectState::PartiallyUnpacked);

        job.unpack_all().unwrap();
        assert_eq!(job.state(), ObjectState::FullyUnpacked);
        assert_eq!(
            job.get("crews").unwrap(),
            Value::List(vec!["lgt".into(), "fx".into()])
        );
    }

    #[test]
    fn unselected_members_read_as_defaults() {
        let mut job = job_row(&[("jobid", Value::I64(7))]);
        assert_eq!(job.get("errors").unwrap(), Value::I64(0));
        assert_eq!(job.get("owner").unwrap(), Value::from(""));
        assert_eq!(job.get("pri").unwrap(), Value::F64(0.0));
    }

    #[test]
    fn unknown_member() {
        let mut job = job_row(&[]);
        let err = job.get("nope").unwrap_err();
        assert!(err.is_no_member_found());
        assert!(job.set("nope", 1).is_err());
    }

    #[test]
    fn set_marks_dirty() {
        let schema = fixtures::render_farm();
        let id = schema.table_by_name("Job").unwrap().id;
        let mut job = DbObject::new(schema, id);

        assert!(!job.in_database());
        job.set("user", "joe").unwrap();
        job.set("pri", 100.0).unwrap();

        assert!(job.is_dirty("user"));
        assert!(job.is_dirty("priority"));
        assert_eq!(job.dirty().collect::<Vec<_>>(), ["user", "priority"]);

        job.clear_dirty();
        assert!(!job.is_dirty("user"));
        job.make_dirty("title").unwrap();
        assert!(job.is_dirty("title"));
    }

    #[test]
    fn set_rejects_values_that_do_not_pack() {
        let mut job = job_row(&[]);
        let err = job.set("errors", "many").unwrap_err();
        assert!(err.is_pack());
        assert!(!job.is_dirty("errors"));
    }

    #[test]
    fn keys_are_immutable_in_database() {
        let mut job = job_row(&[("jobid", Value::I64(7))]);

        let err = job.set("jobid", 8).unwrap_err();
        assert!(err.is_key_modification());

        // assigning the same value is not a modification
        job.set("jobid", 7).unwrap();
        job.set("user", "joe").unwrap();
    }

    #[test]
    fn virtual_members_are_computed() {
        let mut job = job_row(&[("starttime", Value::I64(100)), ("stoptime", Value::I64(160))]);
        assert_eq!(job.get("elapsed").unwrap(), Value::I64(60));
        assert!(job.set("elapsed", 3).unwrap_err().is_incorrect_type());
    }

    #[test]
    fn keys_and_equivalent_keys() {
        let mut job = job_row(&[("jobid", Value::I64(7)), ("user", Value::from("joe"))]);
        job.set("title", "shot").unwrap();

        assert_eq!(job.key().unwrap(), [Value::I64(7)]);
        assert_eq!(job.equiv_key().unwrap(), [Value::from("joe"), Value::from("shot")]);
    }

    #[test]
    fn joined_members_read_through_ext() {
        let schema = fixtures::render_farm();
        let task_id = schema.table_by_name("Task").unwrap().id;
        let mut job = job_row(&[("jobid", Value::I64(7))]);

        let mut raw = Row::new();
        raw.insert("state".to_string(), Value::from("active"));
        let task = DbObject::from_row(schema, task_id, "Task".to_string(), raw);
        job.attach(Arc::new(task));

        assert_eq!(job.get("Task.state").unwrap(), Value::from("active"));
        assert_eq!(job.ext("Task").unwrap().value("state").unwrap(), Value::from("active"));
        assert!(job.get("Command.argv").unwrap_err().is_no_member_found());
    }

    #[test]
    fn evaluates_predicates() {
        use farmql_core::stmt::{self, Expr};

        let mut job = job_row(&[("priority", Value::F64(400.0)), ("user", Value::from("thing"))]);
        let expr = Expr::and(
            Expr::gt(Expr::member("Job", "priority"), 300),
            Expr::eq(Expr::member("Job", "user"), "thing"),
        );
        assert!(stmt::matches(&expr, &mut job).unwrap());
    }
}
