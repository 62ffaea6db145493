use super::Error;

/// Raised when a member list (projection, ordering, grouping or update set)
/// names something the table does not have.
#[derive(Debug)]
pub(super) struct InvalidMember {
    message: Box<str>,
}

impl std::error::Error for InvalidMember {}

impl core::fmt::Display for InvalidMember {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid member: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid member error.
    pub fn invalid_member(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidMember(InvalidMember {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid member error.
    pub fn is_invalid_member(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::InvalidMember(_))
    }
}
