use super::Error;

#[derive(Debug)]
pub(super) struct KeyModification {
    member: Box<str>,
    table: Box<str>,
}

impl std::error::Error for KeyModification {}

impl core::fmt::Display for KeyModification {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "cannot modify member '{}' of {} object, because it is a key member and its record is in the database.",
            self.member, self.table
        )
    }
}

impl Error {
    /// Creates an error for an assignment to a key member of an object that
    /// is already stored.
    pub fn key_modification(member: impl Into<String>, table: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::KeyModification(KeyModification {
            member: member.into().into(),
            table: table.into().into(),
        }))
    }

    pub fn is_key_modification(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::KeyModification(_))
    }
}
