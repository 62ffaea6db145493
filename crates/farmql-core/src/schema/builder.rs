use super::{Field, FieldId, FieldKind, Join, Schema, Subtype, Table, TableId, VirtualField};
use crate::{stmt::Value, Error, Result};

use indexmap::IndexMap;
use std::{collections::HashMap, sync::Arc};

/// Declares a field of a [`TableDef`].
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    member: Option<String>,
    kind: FieldKind,
    key: bool,
    equiv_key: bool,
    index: bool,
    index_len: Option<usize>,
    default: Option<Value>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> FieldDef {
        FieldDef {
            name: name.into(),
            member: None,
            kind,
            key: false,
            equiv_key: false,
            index: false,
            index_len: None,
            default: None,
        }
    }

    /// Exposes the column under a different member name.
    pub fn member(mut self, member: impl Into<String>) -> FieldDef {
        self.member = Some(member.into());
        self
    }

    pub fn key(mut self) -> FieldDef {
        self.key = true;
        self
    }

    pub fn equiv_key(mut self) -> FieldDef {
        self.equiv_key = true;
        self
    }

    pub fn index(mut self) -> FieldDef {
        self.index = true;
        self
    }

    pub fn index_len(mut self, len: usize) -> FieldDef {
        self.index = true;
        self.index_len = Some(len);
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> FieldDef {
        self.default = Some(value.into());
        self
    }
}

/// Declares a member computed from other members.
#[derive(Debug, Clone)]
pub struct VirtualDef {
    member: String,
    dependents: Vec<String>,
    behavior: Arc<dyn VirtualField>,
}

impl VirtualDef {
    pub fn new<I, S>(member: impl Into<String>, dependents: I, behavior: Arc<dyn VirtualField>) -> VirtualDef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        VirtualDef {
            member: member.into(),
            dependents: dependents.into_iter().map(Into::into).collect(),
            behavior,
        }
    }
}

#[derive(Debug, Clone)]
enum Column {
    Stored {
        def: FieldDef,
        subtype: Option<String>,
    },
    Virtual(VirtualDef),
}

/// Declares a table.
#[derive(Debug, Clone)]
pub struct TableDef {
    name: String,
    type_name: Option<String>,
    columns: Vec<Column>,
    subtypes: Vec<Subtype>,
    where_aliases: IndexMap<String, String>,
    aliases: IndexMap<String, String>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> TableDef {
        TableDef {
            name: name.into(),
            type_name: None,
            columns: vec![],
            subtypes: vec![],
            where_aliases: IndexMap::new(),
            aliases: IndexMap::new(),
        }
    }

    /// Names the object type when it differs from the table name.
    pub fn type_name(mut self, type_name: impl Into<String>) -> TableDef {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn field(mut self, def: FieldDef) -> TableDef {
        self.columns.push(Column::Stored { def, subtype: None });
        self
    }

    pub fn virtual_field(mut self, def: VirtualDef) -> TableDef {
        self.columns.push(Column::Virtual(def));
        self
    }

    /// Adds a subtype stored in the same table. `parent` names the subtype
    /// it extends; `None` extends the base type.
    pub fn subtype(
        mut self,
        name: impl Into<String>,
        parent: Option<&str>,
        fields: Vec<FieldDef>,
    ) -> TableDef {
        let name = name.into();
        for def in fields {
            self.columns.push(Column::Stored {
                def,
                subtype: Some(name.clone()),
            });
        }
        self.subtypes.push(Subtype {
            name,
            parent: parent.map(str::to_string),
        });
        self
    }

    pub fn where_alias(mut self, name: impl Into<String>, text: impl Into<String>) -> TableDef {
        self.where_aliases.insert(name.into(), text.into());
        self
    }

    /// Lets `alias` stand in for `member` in WHERE strings and lookups.
    pub fn alias(mut self, alias: impl Into<String>, member: impl Into<String>) -> TableDef {
        self.aliases.insert(alias.into(), member.into());
        self
    }
}

/// Declares a join between two tables, overriding the join derived from
/// common keys.
#[derive(Debug, Clone)]
pub struct JoinDef {
    left: String,
    right: String,
    on: String,
    pre_tables: Vec<String>,
    one_way: bool,
    left_join: bool,
}

impl JoinDef {
    pub fn new(left: impl Into<String>, right: impl Into<String>, on: impl Into<String>) -> JoinDef {
        JoinDef {
            left: left.into(),
            right: right.into(),
            on: on.into(),
            pre_tables: vec![],
            one_way: false,
            left_join: true,
        }
    }

    /// Tables that must already be joined before this join is used.
    pub fn pre_tables<I, S>(mut self, tables: I) -> JoinDef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Does not register the reverse join.
    pub fn one_way(mut self) -> JoinDef {
        self.one_way = true;
        self
    }

    /// Rendered as an inner `JOIN`.
    pub fn inner(mut self) -> JoinDef {
        self.left_join = false;
        self
    }
}

/// Collects table, join and alias declarations into a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: Vec<TableDef>,
    common_keys: Vec<String>,
    joins: Vec<JoinDef>,
    search_order: Vec<(String, Vec<String>)>,
    where_aliases: IndexMap<String, String>,
}

impl SchemaBuilder {
    pub fn table(mut self, table: TableDef) -> SchemaBuilder {
        self.tables.push(table);
        self
    }

    /// Members that link two tables in an automatic join.
    pub fn common_keys<I, S>(mut self, keys: I) -> SchemaBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.common_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn join(mut self, join: JoinDef) -> SchemaBuilder {
        self.joins.push(join);
        self
    }

    /// Tables searched, in order, for bare member names of `table` queries.
    pub fn search_order<I, S>(mut self, table: impl Into<String>, order: I) -> SchemaBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_order
            .push((table.into(), order.into_iter().map(Into::into).collect()));
        self
    }

    pub fn where_alias(mut self, name: impl Into<String>, text: impl Into<String>) -> SchemaBuilder {
        self.where_aliases.insert(name.into(), text.into());
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut tables = vec![];
        let mut by_name = HashMap::new();

        for (index, def) in self.tables.into_iter().enumerate() {
            let table = build_table(TableId(index), def)?;

            for name in [&table.name, &table.type_name] {
                if by_name.insert(name.to_lowercase(), table.id).is_some_and(|id| id != table.id) {
                    return Err(Error::invalid_schema(format!(
                        "table '{name}' is declared twice"
                    )));
                }
            }

            tables.push(table);
        }

        let mut schema = Schema {
            tables,
            common_keys: self.common_keys,
            where_aliases: self.where_aliases,
            joins: HashMap::new(),
            search_order: HashMap::new(),
            by_name,
        };

        for (table, order) in self.search_order {
            let id = lookup_table(&schema, &table)?;
            let order = order
                .iter()
                .map(|name| lookup_table(&schema, name))
                .collect::<Result<Vec<_>>>()?;
            schema.search_order.insert(id, order);
        }

        derive_joins(&mut schema);

        for def in self.joins {
            let left = lookup_table(&schema, &def.left)?;
            let right = lookup_table(&schema, &def.right)?;
            let pre_tables = def
                .pre_tables
                .iter()
                .map(|name| lookup_table(&schema, name))
                .collect::<Result<Vec<_>>>()?;

            let join = Join {
                left,
                right,
                on: def.on,
                pre_tables,
                one_way: def.one_way,
                left_join: def.left_join,
                explicit: true,
            };

            if join.one_way {
                // A derived join back over the same columns would undo the
                // restriction.
                let canonical = join.canonical_on();
                if schema
                    .joins
                    .get(&(right, left))
                    .is_some_and(|reverse| !reverse.explicit && reverse.canonical_on() == canonical)
                {
                    schema.joins.remove(&(right, left));
                }
            } else if !schema.joins.get(&(right, left)).is_some_and(|reverse| {
                reverse.explicit || reverse.canonical_on() == join.canonical_on()
            }) {
                schema.joins.insert(
                    (right, left),
                    Join {
                        left: right,
                        right: left,
                        ..join.clone()
                    },
                );
            }

            schema.joins.insert((left, right), join);
        }

        Ok(schema)
    }
}

fn lookup_table(schema: &Schema, name: &str) -> Result<TableId> {
    schema
        .table_by_name(name)
        .map(|table| table.id)
        .ok_or_else(|| Error::invalid_schema(format!("unknown table '{name}'")))
}

fn build_table(id: TableId, def: TableDef) -> Result<Table> {
    let type_name = def.type_name.unwrap_or_else(|| def.name.clone());

    let mut columns = def.columns;
    let has_discriminator = columns
        .iter()
        .any(|column| matches!(column, Column::Stored { def, .. } if def.kind == FieldKind::ObjType));
    if !def.subtypes.is_empty() && !has_discriminator {
        columns.insert(
            0,
            Column::Stored {
                def: FieldDef::new("objtype", FieldKind::ObjType).index(),
                subtype: None,
            },
        );
    }

    let mut table = Table {
        id,
        name: def.name,
        type_name,
        fields: vec![],
        subtypes: def.subtypes,
        keys: vec![],
        equiv_keys: vec![],
        where_aliases: def.where_aliases,
        aliases: def.aliases,
        discriminator: None,
        by_name: HashMap::new(),
        by_member: HashMap::new(),
        by_select: HashMap::new(),
    };

    for column in columns {
        let index = table.fields.len();
        let field_id = FieldId { table: id, index };

        let field = match column {
            Column::Stored { def, subtype } => {
                if let Some(name) = &subtype {
                    if table.subtype(name).is_none() {
                        return Err(Error::invalid_schema(format!(
                            "unknown subtype '{name}' in table '{}'",
                            table.name
                        )));
                    }
                }

                let member = def.member.unwrap_or_else(|| def.name.clone());
                let packed = member != def.name;
                let select_name = if packed {
                    format!("packed_{member}")
                } else {
                    def.name.clone()
                };

                Field {
                    id: field_id,
                    default: def.default.unwrap_or_else(|| def.kind.default_value()),
                    name: def.name,
                    member,
                    kind: def.kind,
                    key: def.key,
                    equiv_key: def.equiv_key,
                    index: def.index,
                    index_len: def.index_len,
                    packed,
                    select_name,
                    table_name: table.name.clone(),
                    type_name: table.type_name.clone(),
                    subtype,
                    dependents: vec![],
                    virtual_field: None,
                }
            }
            Column::Virtual(def) => Field {
                id: field_id,
                name: def.member.clone(),
                member: def.member.clone(),
                kind: FieldKind::Virtual,
                key: false,
                equiv_key: false,
                index: false,
                index_len: None,
                default: Value::Null,
                packed: false,
                select_name: def.member,
                table_name: table.name.clone(),
                type_name: table.type_name.clone(),
                subtype: None,
                dependents: def.dependents,
                virtual_field: Some(def.behavior),
            },
        };

        if field.kind == FieldKind::ObjType {
            if table.discriminator.is_some() {
                return Err(Error::invalid_schema(format!(
                    "table '{}' declares more than one object type member",
                    table.name
                )));
            }
            table.discriminator = Some(index);
        }

        if !field.is_virtual() && table.by_name.insert(field.name.clone(), index).is_some() {
            return Err(Error::invalid_schema(format!(
                "duplicate column '{}' in table '{}'",
                field.name, table.name
            )));
        }

        if table.by_member.insert(field.member.clone(), index).is_some() {
            return Err(Error::invalid_schema(format!(
                "duplicate member '{}' in table '{}'",
                field.member, table.name
            )));
        }

        table.by_select.insert(field.select_name.clone(), index);

        if field.key {
            table.keys.push(index);
        }
        if field.equiv_key {
            table.equiv_keys.push(index);
        }

        table.fields.push(field);
    }

    for (alias, member) in &table.aliases {
        if !table.by_member.contains_key(member) {
            return Err(Error::invalid_schema(format!(
                "alias '{alias}' refers to unknown member '{member}' of '{}'",
                table.type_name
            )));
        }
    }

    for field in table.fields.iter().filter(|field| field.is_virtual()) {
        if let Some(dependent) = field
            .dependents
            .iter()
            .find(|dependent| !table.by_member.contains_key(*dependent))
        {
            return Err(Error::invalid_schema(format!(
                "virtual member '{}' depends on unknown member '{dependent}'",
                field.member
            )));
        }
    }

    Ok(table)
}

/// Registers a join for every ordered pair of tables sharing common keys.
///
/// Keys are matched in order: key to key, key to equivalent key,
/// equivalent key to key, then equivalent key to equivalent key. The first
/// pairing that shares a common-key member links the tables.
fn derive_joins(schema: &mut Schema) {
    let mut joins = vec![];

    for left in &schema.tables {
        for right in &schema.tables {
            if left.id == right.id {
                continue;
            }

            let pairings = [
                (&left.keys, &right.keys),
                (&left.keys, &right.equiv_keys),
                (&left.equiv_keys, &right.keys),
                (&left.equiv_keys, &right.equiv_keys),
            ];

            for (left_keys, right_keys) in pairings {
                let shared: Vec<&str> = left_keys
                    .iter()
                    .map(|index| left.fields[*index].member.as_str())
                    .filter(|member| schema.common_keys.iter().any(|key| key.as_str() == *member))
                    .filter(|member| {
                        right_keys
                            .iter()
                            .any(|index| right.fields[*index].member == *member)
                    })
                    .collect();

                if shared.is_empty() {
                    continue;
                }

                let on = shared
                    .iter()
                    .filter_map(|member| {
                        let l = left.field_by_member(member)?;
                        let r = right.field_by_member(member)?;
                        Some(format!("{}={}", l.qualified_name(), r.qualified_name()))
                    })
                    .collect::<Vec<_>>()
                    .join(" AND ");

                joins.push(Join {
                    left: left.id,
                    right: right.id,
                    on,
                    pre_tables: vec![],
                    one_way: false,
                    left_join: true,
                    explicit: false,
                });
                break;
            }
        }
    }

    for join in joins {
        schema.joins.insert((join.left, join.right), join);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ElapsedSecs;

    #[test]
    fn duplicate_members_are_rejected() {
        let err = Schema::builder()
            .table(
                TableDef::new("Job")
                    .field(FieldDef::new("jobid", FieldKind::AutoInc).key())
                    .field(FieldDef::new("owner", FieldKind::Text).member("jobid")),
            )
            .build()
            .unwrap_err();
        assert!(err.is_invalid_schema());
    }

    #[test]
    fn two_discriminators_are_rejected() {
        let err = Schema::builder()
            .table(
                TableDef::new("Job")
                    .field(FieldDef::new("kind", FieldKind::ObjType))
                    .field(FieldDef::new("other", FieldKind::ObjType)),
            )
            .build()
            .unwrap_err();
        assert!(err.is_invalid_schema());
    }

    #[test]
    fn alias_to_unknown_member_is_rejected() {
        let err = Schema::builder()
            .table(
                TableDef::new("Job")
                    .field(FieldDef::new("jobid", FieldKind::AutoInc).key())
                    .alias("id", "nope"),
            )
            .build()
            .unwrap_err();
        assert!(err.is_invalid_schema());
    }

    #[test]
    fn packed_fields_select_under_their_member() {
        let schema = Schema::builder()
            .table(
                TableDef::new("Job")
                    .field(FieldDef::new("crews", FieldKind::str_list()).member("huntgroups")),
            )
            .build()
            .unwrap();

        let field = &schema.tables[0].fields[0];
        assert!(field.packed);
        assert_eq!(field.select_name, "packed_huntgroups");
        assert_eq!(
            schema.tables[0].field_by_select_name("packed_huntgroups").unwrap().name,
            "crews"
        );
    }

    #[test]
    fn virtual_dependents_must_exist() {
        let err = Schema::builder()
            .table(
                TableDef::new("Task")
                    .field(FieldDef::new("starttime", FieldKind::TimeInt))
                    .virtual_field(VirtualDef::new(
                        "elapsed",
                        ["starttime", "stoptime"],
                        Arc::new(ElapsedSecs),
                    )),
            )
            .build()
            .unwrap_err();
        assert!(err.is_invalid_schema());
    }

    #[test]
    fn explicit_join_overrides_and_mirrors() {
        let schema = Schema::builder()
            .table(TableDef::new("Job").field(FieldDef::new("jobid", FieldKind::AutoInc).key()))
            .table(
                TableDef::new("Task")
                    .field(FieldDef::new("jobid", FieldKind::Int).key())
                    .field(FieldDef::new("taskid", FieldKind::Int).key()),
            )
            .common_keys(["jobid"])
            .join(JoinDef::new("Job", "Task", "Job.jobid=Task.jobid AND Task.taskid>0").inner())
            .build()
            .unwrap();

        let job = schema.table_by_name("Job").unwrap().id;
        let task = schema.table_by_name("Task").unwrap().id;

        let join = schema.join(job, task).unwrap();
        assert!(join.explicit);
        assert!(!join.left_join);

        let reverse = schema.join(task, job).unwrap();
        assert!(reverse.explicit);
        assert_eq!(reverse.on, join.on);
    }

    #[test]
    fn mirror_keeps_existing_reverse_joins() {
        let builder = || {
            Schema::builder()
                .table(TableDef::new("Job").field(FieldDef::new("jobid", FieldKind::AutoInc).key()))
                .table(TableDef::new("Task").field(FieldDef::new("jobid", FieldKind::Int).key()))
                .common_keys(["jobid"])
        };

        // same columns as the derived reverse, which stays a LEFT JOIN
        let schema = builder()
            .join(JoinDef::new("Job", "Task", "Job.jobid=Task.jobid").inner())
            .build()
            .unwrap();
        let job = schema.table_by_name("Job").unwrap().id;
        let task = schema.table_by_name("Task").unwrap().id;

        assert!(!schema.join(job, task).unwrap().left_join);
        let reverse = schema.join(task, job).unwrap();
        assert!(!reverse.explicit);
        assert!(reverse.left_join);

        // an explicit reverse declared first is not overwritten
        let schema = builder()
            .join(JoinDef::new("Task", "Job", "Task.jobid=Job.jobid AND Job.jobid>0").one_way())
            .join(JoinDef::new("Job", "Task", "Job.jobid=Task.jobid").inner())
            .build()
            .unwrap();

        let reverse = schema.join(task, job).unwrap();
        assert!(reverse.explicit);
        assert_eq!(reverse.on, "Task.jobid=Job.jobid AND Job.jobid>0");
        assert!(reverse.left_join);
    }

    #[test]
    fn one_way_join_removes_derived_reverse() {
        let schema = Schema::builder()
            .table(TableDef::new("Job").field(FieldDef::new("jobid", FieldKind::AutoInc).key()))
            .table(TableDef::new("Task").field(FieldDef::new("jobid", FieldKind::Int).key()))
            .common_keys(["jobid"])
            .join(JoinDef::new("Task", "Job", "Task.jobid=Job.jobid").one_way())
            .build()
            .unwrap();

        let job = schema.table_by_name("Job").unwrap().id;
        let task = schema.table_by_name("Task").unwrap().id;

        assert!(schema.join(task, job).is_some());
        assert!(schema.join(job, task).is_none());
    }
}
