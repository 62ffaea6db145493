use super::Error;

/// Raised when an alias or a command output expands back into itself.
#[derive(Debug)]
pub(super) struct InfiniteLoop {
    message: Box<str>,
}

impl std::error::Error for InfiniteLoop {}

impl core::fmt::Display for InfiniteLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error {
    pub fn infinite_loop(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InfiniteLoop(InfiniteLoop {
            message: message.into().into(),
        }))
    }

    pub fn is_infinite_loop(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::InfiniteLoop(_))
    }
}
