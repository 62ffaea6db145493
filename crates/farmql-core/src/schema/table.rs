use super::Field;

use indexmap::IndexMap;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub usize);

impl From<&TableId> for TableId {
    fn from(value: &TableId) -> Self {
        *value
    }
}

/// A shape of object sharing the table with its base type.
#[derive(Debug, Clone)]
pub struct Subtype {
    pub name: String,

    /// Subtype this one extends; `None` extends the base type.
    pub parent: Option<String>,
}

/// A stored table and the object type(s) it materializes.
#[derive(Debug)]
pub struct Table {
    pub id: TableId,

    /// Storage name.
    pub name: String,

    /// Name of the base object type.
    pub type_name: String,

    /// Every field in declaration order. Virtual fields have no column.
    pub fields: Vec<Field>,

    pub subtypes: Vec<Subtype>,

    /// Indices into `fields` of the primary key.
    pub keys: Vec<usize>,

    /// Indices into `fields` of the equivalent key.
    pub equiv_keys: Vec<usize>,

    /// Named WHERE fragments local to this table.
    pub where_aliases: IndexMap<String, String>,

    /// Alternative member names, alias to member.
    pub aliases: IndexMap<String, String>,

    pub(super) discriminator: Option<usize>,

    pub(super) by_name: HashMap<String, usize>,

    pub(super) by_member: HashMap<String, usize>,

    pub(super) by_select: HashMap<String, usize>,
}

impl Table {
    /// Looks up a field by member name, then by member alias.
    pub fn field_by_member(&self, member: &str) -> Option<&Field> {
        let index = self.by_member.get(member).or_else(|| {
            self.aliases
                .get(member)
                .and_then(|target| self.by_member.get(target))
        })?;
        Some(&self.fields[*index])
    }

    /// Looks up a field by storage column name.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|index| &self.fields[*index])
    }

    /// Looks up a field by the name it is selected as.
    pub fn field_by_select_name(&self, name: &str) -> Option<&Field> {
        self.by_select.get(name).map(|index| &self.fields[*index])
    }

    /// Fields backed by a storage column.
    pub fn columns(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| !field.is_virtual())
    }

    pub fn keys(&self) -> impl Iterator<Item = &Field> {
        self.keys.iter().map(|index| &self.fields[*index])
    }

    pub fn equiv_keys(&self) -> impl Iterator<Item = &Field> {
        self.equiv_keys.iter().map(|index| &self.fields[*index])
    }

    /// The auto-increment key, if the table has one.
    pub fn auto_increment(&self) -> Option<&Field> {
        self.keys().find(|field| field.kind.is_auto_increment())
    }

    /// The field recording the subtype of each row.
    pub fn discriminator(&self) -> Option<&Field> {
        self.discriminator.map(|index| &self.fields[index])
    }

    pub fn subtype(&self, name: &str) -> Option<&Subtype> {
        self.subtypes.iter().find(|subtype| subtype.name == name)
    }

    /// True if `type_name` is the base type or one of its subtypes.
    pub fn has_type(&self, type_name: &str) -> bool {
        self.type_name == type_name || self.subtype(type_name).is_some()
    }

    /// `type_name` followed by every ancestor up to the base type.
    pub fn lineage<'a>(&'a self, type_name: &'a str) -> Vec<&'a str> {
        let mut lineage = vec![];
        let mut current = Some(type_name);

        while let Some(name) = current {
            if lineage.contains(&name) {
                break;
            }
            lineage.push(name);
            current = self.subtype(name).map(|subtype| {
                subtype
                    .parent
                    .as_deref()
                    .unwrap_or(self.type_name.as_str())
            });
        }

        lineage
    }

    /// Fields that belong to objects of `type_name`: base fields plus those
    /// declared by the subtype and its ancestors.
    pub fn fields_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        let lineage = self.lineage(type_name);
        self.fields.iter().filter(move |field| match &field.subtype {
            None => true,
            Some(subtype) => lineage.contains(&subtype.as_str()),
        })
    }
}
