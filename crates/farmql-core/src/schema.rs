mod builder;
pub use builder::{FieldDef, JoinDef, SchemaBuilder, TableDef, VirtualDef};

mod field;
pub use field::{Field, FieldId};

mod field_kind;
pub use field_kind::{Category, FieldKind};

mod join;
pub use join::Join;

mod pack;
pub use pack::{epoch_to_local, to_timestamp, Packed};

mod table;
pub use table::{Subtype, Table, TableId};

mod virtual_field;
pub use virtual_field::{ElapsedSecs, Formatted, VirtualField};

use crate::{Error, Result};

use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};

/// The registry of every table a query can touch.
///
/// A schema is built once with [`Schema::builder`] and is read-only
/// afterwards; share it behind an `Arc`.
#[derive(Debug)]
pub struct Schema {
    pub tables: Vec<Table>,

    /// Member names that may link two tables in an automatic join.
    pub common_keys: Vec<String>,

    /// WHERE aliases available to every table.
    pub where_aliases: IndexMap<String, String>,

    joins: HashMap<(TableId, TableId), Join>,

    search_order: HashMap<TableId, Vec<TableId>>,

    by_name: HashMap<String, TableId>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn table(&self, id: impl Into<TableId>) -> &Table {
        &self.tables[id.into().0]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.tables[id.table.0].fields[id.index]
    }

    /// Finds a table by type name or storage name, ignoring case.
    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|id| &self.tables[id.0])
    }

    /// Resolves a member reference.
    ///
    /// `Type.member` is looked up in `Type` only. A bare member is looked up
    /// following the search order registered for `primary`, or the primary
    /// table first and then every other table in declaration order.
    pub fn field_by_member(&self, name: &str, primary: Option<TableId>) -> Option<&Field> {
        if let Some((table, member)) = name.split_once('.') {
            return self.table_by_name(table)?.field_by_member(member);
        }

        self.search_order(primary)
            .into_iter()
            .find_map(|id| self.tables[id.0].field_by_member(name))
    }

    /// Tables searched, in order, when resolving a bare member name.
    pub fn search_order(&self, primary: Option<TableId>) -> Vec<TableId> {
        if let Some(order) = primary.and_then(|id| self.search_order.get(&id)) {
            return order.clone();
        }

        let mut order: Vec<_> = primary.into_iter().collect();
        order.extend(
            self.tables
                .iter()
                .map(|table| table.id)
                .filter(|id| Some(*id) != primary),
        );
        order
    }

    /// Returns the join linking `left` to `right`, if one exists.
    pub fn join(&self, left: TableId, right: TableId) -> Option<&Join> {
        self.joins.get(&(left, right))
    }

    /// Orders the joins needed to reach every table in `tables` from
    /// `primary`.
    ///
    /// Tables are placed breadth-first. A join is only used once all of its
    /// prerequisite tables have been placed, and tables that cannot be
    /// reached directly are reached through intermediate tables.
    pub fn join_path(&self, primary: TableId, tables: &[TableId]) -> Result<Vec<&Join>> {
        let mut placed = vec![primary];
        let mut pending: VecDeque<TableId> = VecDeque::new();
        for id in tables {
            if *id != primary && !pending.contains(id) {
                pending.push_back(*id);
            }
        }

        let mut path = vec![];

        while !pending.is_empty() {
            let mut progress = false;

            for _ in 0..pending.len() {
                let Some(id) = pending.pop_front() else {
                    break;
                };

                if placed.contains(&id) {
                    progress = true;
                    continue;
                }

                let mut blocked = None;
                let join = placed.iter().find_map(|from| {
                    let join = self.join(*from, id)?;
                    if join.pre_tables.iter().all(|pre| placed.contains(pre)) {
                        Some(join)
                    } else {
                        blocked.get_or_insert(join);
                        None
                    }
                });

                match join {
                    Some(join) => {
                        path.push(join);
                        placed.push(id);
                        progress = true;
                    }
                    None => {
                        // Queue the missing prerequisites ahead of the retry.
                        for pre in blocked.map(|join| &join.pre_tables[..]).unwrap_or_default() {
                            if !placed.contains(pre) && !pending.contains(pre) {
                                pending.push_back(*pre);
                                progress = true;
                            }
                        }
                        pending.push_back(id);
                    }
                }
            }

            if progress {
                continue;
            }

            // Nothing reachable directly; route through other tables.
            let target = pending[0];
            let mut routed = false;
            for id in self.route(&placed, target).unwrap_or_default().into_iter().rev() {
                if !pending.contains(&id) {
                    pending.push_front(id);
                    routed = true;
                }
            }

            if !routed {
                return Err(Error::unjoinable(
                    &self.table(target).type_name,
                    &self.table(primary).type_name,
                ));
            }
        }

        Ok(path)
    }

    /// Shortest chain of intermediate tables linking any placed table to
    /// `target`, excluding both ends.
    fn route(&self, placed: &[TableId], target: TableId) -> Option<Vec<TableId>> {
        let mut prev: HashMap<TableId, TableId> = HashMap::new();
        let mut queue: VecDeque<TableId> = placed.iter().copied().collect();

        while let Some(from) = queue.pop_front() {
            for table in &self.tables {
                let to = table.id;
                if placed.contains(&to) || prev.contains_key(&to) || self.join(from, to).is_none()
                {
                    continue;
                }
                prev.insert(to, from);

                if to == target {
                    let mut route = vec![];
                    let mut at = from;
                    while !placed.contains(&at) {
                        route.push(at);
                        at = prev[&at];
                    }
                    route.reverse();
                    return (!route.is_empty()).then_some(route);
                }

                queue.push_back(to);
            }
        }

        None
    }
}
