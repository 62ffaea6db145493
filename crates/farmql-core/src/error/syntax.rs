use super::Error;

/// Raised by the WHERE parser when tokens appear in an order the grammar
/// does not allow: unbalanced parentheses, dangling operators, lists in the
/// wrong position and so on.
#[derive(Debug)]
pub(super) struct SyntaxError {
    message: Box<str>,
}

impl std::error::Error for SyntaxError {}

impl core::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error {
    /// Creates a WHERE syntax error.
    pub fn syntax(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Syntax(SyntaxError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a WHERE syntax error.
    pub fn is_syntax(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Syntax(_))
    }
}
