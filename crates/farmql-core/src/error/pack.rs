use super::Error;

/// Error when a value cannot be packed into its storage representation.
#[derive(Debug)]
pub(super) struct PackError {
    member: Box<str>,
    value: Box<str>,
    expected: Box<str>,
}

impl std::error::Error for PackError {}

impl core::fmt::Display for PackError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "Cannot convert member \"{}\" to {}. Got {}",
            self.member, self.expected, self.value
        )
    }
}

impl Error {
    /// Creates a pack error naming the member, the offending value and what
    /// the field expected instead.
    pub fn pack(
        member: impl Into<String>,
        value: impl core::fmt::Display,
        expected: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::Pack(PackError {
            member: member.into().into(),
            value: value.to_string().into(),
            expected: expected.into().into(),
        }))
    }

    /// Returns `true` if this error is a pack error.
    pub fn is_pack(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Pack(_))
    }
}
