use super::{Category, FieldKind, TableId, VirtualField};
use crate::stmt::Value;

use std::{fmt, sync::Arc};

/// Uniquely identifies a field within a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    pub table: TableId,
    pub index: usize,
}

/// A column of a table and the object member it maps to.
#[derive(Clone)]
pub struct Field {
    pub id: FieldId,

    /// Column name in storage.
    pub name: String,

    /// Member name on the object. Differs from `name` for packed fields.
    pub member: String,

    pub kind: FieldKind,

    /// Part of the table's primary key.
    pub key: bool,

    /// Part of an alternate key identifying a record when the primary key is
    /// not known.
    pub equiv_key: bool,

    /// Indexed in storage.
    pub index: bool,

    /// Prefix length of the index for text columns.
    pub index_len: Option<usize>,

    pub default: Value,

    /// True when the member name differs from the column name. Packed fields
    /// are selected under `packed_<member>`.
    pub packed: bool,

    /// Name the column is selected as.
    pub select_name: String,

    /// Storage name of the owning table.
    pub table_name: String,

    /// Type name of the owning table.
    pub type_name: String,

    /// Subtype that declares the field, `None` for base fields.
    pub subtype: Option<String>,

    /// Members a virtual field is computed from.
    pub dependents: Vec<String>,

    pub virtual_field: Option<Arc<dyn VirtualField>>,
}

impl Field {
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, FieldKind::Virtual)
    }

    pub fn is_list(&self) -> bool {
        self.kind.is_list()
    }

    /// The column qualified by its table, as used in WHERE clauses.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table_name, self.name)
    }

    /// The member qualified by its type, as written in WHERE strings.
    pub fn qualified_member(&self) -> String {
        format!("{}.{}", self.type_name, self.member)
    }

    pub fn table(&self) -> TableId {
        self.id.table
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("member", &self.member)
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("equiv_key", &self.equiv_key)
            .field("default", &self.default)
            .finish()
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Field) -> bool {
        self.id == other.id
    }
}
