use super::Error;

#[derive(Debug)]
pub(super) enum JoinError {
    /// No join path exists from the primary table.
    Unjoinable { table: Box<str>, primary: Box<str> },

    /// An UPDATE whose WHERE clause references another table.
    InUpdate,

    /// A DELETE whose WHERE clause references another table.
    InDelete,
}

impl std::error::Error for JoinError {}

impl core::fmt::Display for JoinError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            JoinError::Unjoinable { table, primary } => {
                write!(f, "unable to join {table} with '{primary}'")
            }
            JoinError::InUpdate => f.write_str("update queries cannot contain table joins"),
            JoinError::InDelete => f.write_str("delete queries cannot contain table joins"),
        }
    }
}

impl Error {
    /// Creates an error for a table that cannot be reached from the primary
    /// table of a query.
    pub fn unjoinable(table: impl Into<String>, primary: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Join(JoinError::Unjoinable {
            table: table.into().into(),
            primary: primary.into().into(),
        }))
    }

    pub fn join_in_update() -> Error {
        Error::from(super::ErrorKind::Join(JoinError::InUpdate))
    }

    pub fn join_in_delete() -> Error {
        Error::from(super::ErrorKind::Join(JoinError::InDelete))
    }

    /// Returns `true` for any join error.
    pub fn is_join(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Join(_))
    }
}
