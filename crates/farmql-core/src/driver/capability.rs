use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The SQL dialect spoken by a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    #[default]
    Sqlite,
    Postgresql,
    Mysql,
}

impl FromStr for Flavor {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Flavor> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Flavor::Sqlite),
            "postgresql" | "postgres" => Ok(Flavor::Postgresql),
            "mysql" => Ok(Flavor::Mysql),
            _ => Err(crate::err!("unknown SQL flavor '{s}'")),
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Flavor::Sqlite => "sqlite",
            Flavor::Postgresql => "postgresql",
            Flavor::Mysql => "mysql",
        })
    }
}

#[derive(Debug)]
pub struct Capability {
    pub flavor: Flavor,

    /// Array columns are stored natively rather than as text literals.
    pub native_arrays: bool,

    /// Inserts can set an auto-increment key explicitly and the counter
    /// moves past it.
    pub explicit_auto_increment: bool,
}

impl Capability {
    /// SQLite capabilities.
    pub const SQLITE: Self = Self {
        flavor: Flavor::Sqlite,
        native_arrays: false,
        explicit_auto_increment: true,
    };

    /// PostgreSQL capabilities
    pub const POSTGRESQL: Self = Self {
        flavor: Flavor::Postgresql,
        native_arrays: true,
        explicit_auto_increment: false,
    };

    /// MySQL capabilities
    pub const MYSQL: Self = Self {
        flavor: Flavor::Mysql,
        ..Self::SQLITE
    };

    pub fn of(flavor: Flavor) -> &'static Capability {
        match flavor {
            Flavor::Sqlite => &Self::SQLITE,
            Flavor::Postgresql => &Self::POSTGRESQL,
            Flavor::Mysql => &Self::MYSQL,
        }
    }
}
