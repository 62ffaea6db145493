use super::{Error, ErrorKind};

/// A table, field, alias or join declaration that cannot be built, or a
/// schema lookup that the declarations do not support.
#[derive(Debug)]
pub(super) struct InvalidSchema {
    reason: Box<str>,
}

impl core::fmt::Display for InvalidSchema {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "schema error: {}", self.reason)
    }
}

impl Error {
    pub fn invalid_schema(reason: impl Into<String>) -> Error {
        ErrorKind::InvalidSchema(InvalidSchema {
            reason: reason.into().into(),
        })
        .into()
    }

    pub fn is_invalid_schema(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidSchema(_))
    }
}
