use super::Error;

/// Raised when an operand has the wrong shape for its operator, e.g. a
/// scalar on the right of `in`.
#[derive(Debug)]
pub(super) struct IncorrectType {
    message: Box<str>,
}

impl std::error::Error for IncorrectType {}

impl core::fmt::Display for IncorrectType {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error {
    pub fn incorrect_type(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::IncorrectType(IncorrectType {
            message: message.into().into(),
        }))
    }

    pub fn is_incorrect_type(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::IncorrectType(_))
    }
}
