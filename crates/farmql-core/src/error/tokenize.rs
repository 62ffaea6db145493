use super::Error;

/// Raised when no token class matches the remaining WHERE text.
#[derive(Debug)]
pub(super) struct TokenizeError {
    remaining: Box<str>,
}

impl std::error::Error for TokenizeError {}

impl core::fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "syntax error in where string near: '{}'", self.remaining)
    }
}

impl Error {
    /// Creates a tokenize error for the unmatched tail of a WHERE string.
    pub fn tokenize(remaining: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Tokenize(TokenizeError {
            remaining: remaining.into().into(),
        }))
    }

    /// Returns `true` if this error is a tokenize error.
    pub fn is_tokenize(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Tokenize(_))
    }
}
