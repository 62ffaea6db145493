use super::{Error, ErrorKind};

/// More than one stored record matched a lookup that identifies a single
/// object.
#[derive(Debug)]
pub(super) struct TooManyRecords {
    table: Box<str>,
    count: usize,
    matching: Box<str>,
}

impl core::fmt::Display for TooManyRecords {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "expected one {} record matching {}, found {}",
            self.table, self.matching, self.count
        )
    }
}

impl Error {
    pub fn too_many_records(table: &str, count: usize, matching: impl Into<String>) -> Error {
        ErrorKind::TooManyRecords(TooManyRecords {
            table: table.into(),
            count,
            matching: matching.into().into(),
        })
        .into()
    }

    pub fn is_too_many_records(&self) -> bool {
        matches!(self.kind(), ErrorKind::TooManyRecords(_))
    }
}
