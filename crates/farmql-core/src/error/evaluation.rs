use super::Error;

/// Error when the predicate interpreter cannot evaluate an expression, for
/// example a `like` pattern that is not a valid regular expression.
#[derive(Debug)]
pub(super) struct EvaluationError {
    message: Box<str>,
}

impl std::error::Error for EvaluationError {}

impl core::fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "expression evaluation failed: {}", self.message)
    }
}

impl Error {
    pub fn evaluation(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Evaluation(EvaluationError {
            message: message.into().into(),
        }))
    }

    pub fn is_evaluation(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Evaluation(_))
    }
}
