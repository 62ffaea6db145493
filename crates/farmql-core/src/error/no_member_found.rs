use super::Error;

/// Raised in strict mode when an identifier resolves to neither a member nor
/// an alias, or when a comparison has no member on either side.
#[derive(Debug)]
pub(super) struct NoMemberFound {
    message: Box<str>,
}

impl std::error::Error for NoMemberFound {}

impl core::fmt::Display for NoMemberFound {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error {
    pub fn no_member_found(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::NoMemberFound(NoMemberFound {
            message: message.into().into(),
        }))
    }

    pub fn is_no_member_found(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::NoMemberFound(_))
    }
}
