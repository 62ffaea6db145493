use crate::{format::FieldFormat, DbObject, Error, Result};

use farmql_core::{
    driver::Row,
    schema::{Field, FieldId, Table, TableId},
    Schema,
};
use indexmap::IndexMap;
use std::{collections::HashMap, sync::Arc};

/// The rows of a query, turned into objects as they are read.
///
/// An object is materialized the first time its index is read. With object
/// caching enabled (the default) it is kept, so later reads return the same
/// object including any member assigned in the meantime. Objects of joined
/// tables are shared between rows carrying the same key.
#[derive(Debug)]
pub struct QueryResult {
    schema: Arc<Schema>,
    table: TableId,

    /// Fields selected by the query.
    members: Vec<FieldId>,

    rows: Vec<Row>,

    cache_objects: bool,
    objects: Vec<Option<DbObject>>,

    /// The last object read when caching is disabled.
    current: Option<DbObject>,

    /// Joined objects by `"<Type>,<key values>"`.
    ext_cache: HashMap<String, Arc<DbObject>>,
}

impl QueryResult {
    pub fn new(schema: Arc<Schema>, table: TableId, members: Vec<FieldId>, rows: Vec<Row>) -> QueryResult {
        let objects = (0..rows.len()).map(|_| None).collect();
        QueryResult {
            schema,
            table,
            members,
            rows,
            cache_objects: true,
            objects,
            current: None,
            ext_cache: HashMap::new(),
        }
    }

    /// A result over objects that already exist, such as freshly inserted
    /// ones.
    pub(crate) fn from_objects(schema: Arc<Schema>, table: TableId, objects: Vec<DbObject>) -> QueryResult {
        let members = schema
            .table(table)
            .columns()
            .map(|field| field.id)
            .collect();

        QueryResult {
            schema,
            table,
            members,
            rows: (0..objects.len()).map(|_| Row::new()).collect(),
            cache_objects: true,
            objects: objects.into_iter().map(Some).collect(),
            current: None,
            ext_cache: HashMap::new(),
        }
    }

    /// Keeps materialized objects between reads.
    pub fn cache_objects(mut self, enabled: bool) -> QueryResult {
        self.cache_objects = enabled;
        if !enabled {
            for object in &mut self.objects {
                *object = None;
            }
        }
        self
    }

    pub fn table(&self) -> &Table {
        self.schema.table(self.table)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The raw rows, keyed by select name.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Fields selected by the query.
    pub fn members(&self) -> Vec<&Field> {
        self.members.iter().map(|id| self.schema.field(*id)).collect()
    }

    /// The object at `index`, materializing it if needed.
    pub fn get(&mut self, index: usize) -> Result<Option<&mut DbObject>> {
        if index >= self.objects.len() {
            return Ok(None);
        }

        if !self.cache_objects {
            let object = self.materialize(index)?;
            self.current = Some(object);
            return Ok(self.current.as_mut());
        }

        if self.objects[index].is_none() {
            let object = self.materialize(index)?;
            self.objects[index] = Some(object);
        }
        Ok(self.objects[index].as_mut())
    }

    pub fn iter(&mut self) -> impl Iterator<Item = Result<DbObject>> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index).map(|object| object.cloned()).transpose())
    }

    pub fn to_objects(&mut self) -> Result<Vec<DbObject>> {
        self.iter().collect()
    }

    pub fn into_objects(mut self) -> Result<Vec<DbObject>> {
        for index in 0..self.len() {
            if self.objects[index].is_none() {
                let object = self.materialize(index)?;
                self.objects[index] = Some(object);
            }
        }
        Ok(self.objects.into_iter().flatten().collect())
    }

    /// The first object whose primary key equals `key`.
    pub fn object_by_key(&mut self, key: &[farmql_core::stmt::Value]) -> Result<Option<&mut DbObject>> {
        for index in 0..self.len() {
            let found = match self.get(index)? {
                Some(object) => object.key()? == key,
                None => false,
            };
            if found {
                return self.get(index);
            }
        }
        Ok(None)
    }

    /// Objects keyed by the values of `members`. Two objects with the same
    /// values are an error; see [`to_groups`](QueryResult::to_groups).
    pub fn to_map(&mut self, members: &[&str]) -> Result<IndexMap<String, DbObject>> {
        let mut map = IndexMap::new();

        for object in self.iter() {
            let mut object = object?;
            let key = map_key(&mut object, members)?;
            if map.contains_key(&key) {
                return Err(Error::invalid_result(format!(
                    "more than one object has the key '{key}'"
                )));
            }
            map.insert(key, object);
        }

        Ok(map)
    }

    /// Objects grouped by the values of `members`.
    pub fn to_groups(&mut self, members: &[&str]) -> Result<IndexMap<String, Vec<DbObject>>> {
        let mut groups: IndexMap<String, Vec<DbObject>> = IndexMap::new();

        for object in self.iter() {
            let mut object = object?;
            let key = map_key(&mut object, members)?;
            groups.entry(key).or_default().push(object);
        }

        Ok(groups)
    }

    /// Widest rendering of each member across all objects, header included.
    pub fn field_widths(&mut self, members: &[&str]) -> Result<IndexMap<String, usize>> {
        let schema = self.schema.clone();
        let columns: Vec<(String, FieldFormat)> = resolve(&schema, self.table, &self.members, members)?
            .into_iter()
            .map(|(name, field)| (name, FieldFormat::for_field(field)))
            .collect();

        let mut widths: IndexMap<String, usize> = columns
            .iter()
            .map(|(name, _)| (name.clone(), name.chars().count()))
            .collect();

        for index in 0..self.len() {
            let Some(object) = self.get(index)? else {
                break;
            };
            for (name, format) in &columns {
                let width = format.render(&object.get(name)?).chars().count();
                if let Some(widest) = widths.get_mut(name) {
                    *widest = (*widest).max(width);
                }
            }
        }

        Ok(widths)
    }

    /// Member names as read from objects of this result, with their fields.
    pub(crate) fn resolve(&self, members: &[&str]) -> Result<Vec<(String, &Field)>> {
        resolve(&self.schema, self.table, &self.members, members)
    }

    fn materialize(&mut self, index: usize) -> Result<DbObject> {
        let row = self.rows[index].clone();
        let schema = self.schema.clone();

        let mut own = Row::new();
        let mut joined: IndexMap<String, Row> = IndexMap::new();

        for (column, value) in row {
            match column.split_once('.') {
                Some((type_name, name)) => {
                    joined
                        .entry(type_name.to_string())
                        .or_default()
                        .insert(name.to_string(), value);
                }
                None => {
                    own.insert(column, value);
                }
            }
        }

        let table = schema.table(self.table);
        let type_name = type_of(table, &own);
        let mut object = DbObject::from_row(schema.clone(), self.table, type_name, own);

        for (type_name, raw) in joined {
            let ext = self.ext_object(&schema, &type_name, raw)?;
            object.attach(ext);
        }

        Ok(object)
    }

    fn ext_object(&mut self, schema: &Arc<Schema>, type_name: &str, raw: Row) -> Result<Arc<DbObject>> {
        let Some(table) = schema.table_by_name(type_name) else {
            return Err(Error::invalid_result(format!(
                "row has columns of unknown type '{type_name}'"
            )));
        };

        let key = if table.keys.is_empty() {
            None
        } else {
            let values: Vec<String> = table
                .keys()
                .map(|field| raw.get(&field.select_name).map(|v| v.to_text()).unwrap_or_default())
                .collect();
            Some(format!("{},{}", table.type_name, values.join(",")))
        };

        if let Some(ext) = key.as_ref().and_then(|key| self.ext_cache.get(key)) {
            return Ok(ext.clone());
        }

        let mut object = DbObject::from_row(schema.clone(), table.id, type_of(table, &raw), raw);
        object.unpack_all()?;
        let object = Arc::new(object);

        if let Some(key) = key {
            self.ext_cache.insert(key, object.clone());
        }
        Ok(object)
    }
}

/// The subtype named by the discriminator column, or the base type when the
/// row carries none or an unknown one.
fn type_of(table: &Table, raw: &Row) -> String {
    table
        .discriminator()
        .and_then(|field| raw.get(&field.select_name))
        .and_then(|value| value.as_str())
        .filter(|name| table.has_type(name))
        .unwrap_or(&table.type_name)
        .to_string()
}

fn map_key(object: &mut DbObject, members: &[&str]) -> Result<String> {
    let values = members
        .iter()
        .map(|member| Ok(object.get(member)?.to_text()))
        .collect::<Result<Vec<_>>>()?;
    Ok(values.join(","))
}

fn resolve<'a>(
    schema: &'a Schema,
    primary: TableId,
    selected: &[FieldId],
    members: &[&str],
) -> Result<Vec<(String, &'a Field)>> {
    let name = |field: &Field| {
        if field.table() == primary {
            field.member.clone()
        } else {
            field.qualified_member()
        }
    };

    if members.is_empty() {
        return Ok(selected
            .iter()
            .map(|id| schema.field(*id))
            .map(|field| (name(field), field))
            .collect());
    }

    members
        .iter()
        .map(|member| {
            let field = schema
                .field_by_member(member, Some(primary))
                .ok_or_else(|| Error::invalid_member(format!("'{member}' names no field")))?;
            Ok((name(field), field))
        })
        .collect()
}
