use crate::Result;

use farmql_core::driver::Flavor;
use serde::{Deserialize, Serialize};

/// Knobs of a [`Db`](crate::Db) handle.
///
/// Every field has a default, so a JSON document only needs to name the
/// settings it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQL dialect. Replaced by the driver's flavor when a `Db` is built.
    pub flavor: Flavor,

    /// Most rows sent in one INSERT statement.
    pub batch_insert_size: usize,

    /// Most bytes of SQL sent in one INSERT statement.
    pub max_query_length: usize,

    /// Keep materialized objects of a `QueryResult` between lookups.
    pub cache_objects: bool,

    /// Reject WHERE words that name no member or alias.
    pub strict: bool,

    /// Refuse every statement that writes.
    pub read_only: bool,

    /// Select the members virtual fields are computed from.
    pub virtual_fields: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            flavor: Flavor::default(),
            batch_insert_size: 500,
            max_query_length: 65536,
            cache_objects: true,
            strict: true,
            read_only: false,
            virtual_fields: true,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Config> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn flavor(mut self, flavor: Flavor) -> Config {
        self.flavor = flavor;
        self
    }

    pub fn batch_insert_size(mut self, rows: usize) -> Config {
        self.batch_insert_size = rows.max(1);
        self
    }

    pub fn max_query_length(mut self, bytes: usize) -> Config {
        self.max_query_length = bytes;
        self
    }

    pub fn cache_objects(mut self, enabled: bool) -> Config {
        self.cache_objects = enabled;
        self
    }

    pub fn strict(mut self, strict: bool) -> Config {
        self.strict = strict;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Config {
        self.read_only = read_only;
        self
    }

    pub fn virtual_fields(mut self, enabled: bool) -> Config {
        self.virtual_fields = enabled;
        self
    }
}
