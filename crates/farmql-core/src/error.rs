mod adhoc;
mod evaluation;
mod incorrect_type;
mod infinite_loop;
mod invalid_member;
mod invalid_result;
mod invalid_schema;
mod join;
mod key_modification;
mod no_member_found;
mod pack;
mod storage;
mod syntax;
mod tokenize;
mod too_many_records;

use adhoc::AdhocError;
use evaluation::EvaluationError;
use incorrect_type::IncorrectType;
use infinite_loop::InfiniteLoop;
use invalid_member::InvalidMember;
use invalid_result::InvalidResult;
use invalid_schema::InvalidSchema;
use join::JoinError;
use key_modification::KeyModification;
use no_member_found::NoMemberFound;
use pack::PackError;
use storage::StorageError;
use std::sync::Arc;
use syntax::SyntaxError;
use tokenize::TokenizeError;
use too_many_records::TooManyRecords;

/// Returns early with an ad-hoc error built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Builds an ad-hoc error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error that can occur while compiling or executing a farmql query.
#[derive(Clone)]
pub struct Error {
    inner: Option<Arc<ErrorInner>>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

impl Error {
    /// Adds context to this error.
    ///
    /// Context is displayed in reverse order: the most recently added context
    /// is shown first, followed by earlier context, ending with the root cause.
    #[inline(always)]
    pub fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let kind = match consequent.inner {
            Some(inner) => match Arc::try_unwrap(inner) {
                Ok(inner) => inner.kind,
                Err(shared) => ErrorKind::Adhoc(AdhocError::new(shared.kind.to_string())),
            },
            None => ErrorKind::Unknown,
        };

        Error {
            inner: Some(Arc::new(ErrorInner {
                kind,
                cause: Some(self),
            })),
        }
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = self;
        core::iter::once(err).chain(core::iter::from_fn(move || {
            err = err.inner.as_ref().and_then(|inner| inner.cause.as_ref())?;
            Some(err)
        }))
    }

    fn kind(&self) -> &ErrorKind {
        self.inner
            .as_ref()
            .map(|inner| &inner.kind)
            .unwrap_or(&ErrorKind::Unknown)
    }

    /// Returns `true` if this error, or any error it wraps, was raised by the
    /// storage backend rather than by query compilation.
    pub fn is_storage(&self) -> bool {
        self.chain()
            .any(|err| matches!(err.kind(), ErrorKind::Storage(_)))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Storage(err) => err.source(),
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(err.kind(), f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if !f.alternate() {
            core::fmt::Display::fmt(self, f)
        } else {
            let Some(ref inner) = self.inner else {
                return f.debug_struct("Error").field("kind", &"None").finish();
            };
            f.debug_struct("Error")
                .field("kind", &inner.kind)
                .field("cause", &inner.cause)
                .finish()
        }
    }
}

#[derive(Debug)]
enum ErrorKind {
    Anyhow(anyhow::Error),
    Adhoc(AdhocError),
    Tokenize(TokenizeError),
    Syntax(SyntaxError),
    InfiniteLoop(InfiniteLoop),
    NoMemberFound(NoMemberFound),
    IncorrectType(IncorrectType),
    InvalidMember(InvalidMember),
    InvalidSchema(InvalidSchema),
    Join(JoinError),
    Pack(PackError),
    KeyModification(KeyModification),
    TooManyRecords(TooManyRecords),
    Evaluation(EvaluationError),
    InvalidResult(InvalidResult),
    Storage(StorageError),
    Unknown,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self {
            Anyhow(err) => core::fmt::Display::fmt(err, f),
            Adhoc(err) => core::fmt::Display::fmt(err, f),
            Tokenize(err) => core::fmt::Display::fmt(err, f),
            Syntax(err) => core::fmt::Display::fmt(err, f),
            InfiniteLoop(err) => core::fmt::Display::fmt(err, f),
            NoMemberFound(err) => core::fmt::Display::fmt(err, f),
            IncorrectType(err) => core::fmt::Display::fmt(err, f),
            InvalidMember(err) => core::fmt::Display::fmt(err, f),
            InvalidSchema(err) => core::fmt::Display::fmt(err, f),
            Join(err) => core::fmt::Display::fmt(err, f),
            Pack(err) => core::fmt::Display::fmt(err, f),
            KeyModification(err) => core::fmt::Display::fmt(err, f),
            TooManyRecords(err) => core::fmt::Display::fmt(err, f),
            Evaluation(err) => core::fmt::Display::fmt(err, f),
            InvalidResult(err) => core::fmt::Display::fmt(err, f),
            Storage(err) => core::fmt::Display::fmt(err, f),
            Unknown => f.write_str("unknown farmql error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Some(Arc::new(ErrorInner { kind, cause: None })),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

/// Trait for types that can be converted into an Error.
pub trait IntoError {
    /// Converts this type into an Error.
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    #[inline(always)]
    fn into_error(self) -> Error {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_size() {
        // Error stays at one word
        let expected_size = core::mem::size_of::<usize>();
        assert_eq!(expected_size, core::mem::size_of::<Error>());
    }

    #[test]
    fn error_from_args() {
        let err = Error::from_args(format_args!("test error: {}", 42));
        assert_eq!(err.to_string(), "test error: 42");
    }

    #[test]
    fn error_chain_display() {
        let root = Error::from_args(format_args!("root cause"));
        let mid = Error::from_args(format_args!("middle context"));
        let top = Error::from_args(format_args!("top context"));

        let chained = root.context(mid).context(top);
        assert_eq!(
            chained.to_string(),
            "top context: middle context: root cause"
        );
    }

    #[test]
    fn anyhow_bridge() {
        let anyhow_err = anyhow::anyhow!("something failed");
        let our_err: Error = anyhow_err.into();
        assert_eq!(our_err.to_string(), "something failed");
    }

    #[test]
    fn tokenize_error() {
        let err = Error::tokenize("!!user");
        assert!(err.is_tokenize());
        assert_eq!(
            err.to_string(),
            "syntax error in where string near: '!!user'"
        );
    }

    #[test]
    fn infinite_loop_error() {
        let err = Error::infinite_loop("referencing 'done' in where statement will cause an infinite loop.");
        assert!(err.is_infinite_loop());
        assert_eq!(
            err.to_string(),
            "referencing 'done' in where statement will cause an infinite loop."
        );
    }

    #[test]
    fn pack_error_carries_member_and_value() {
        let err = Error::pack("numtasks", "abc", "an integer");
        assert!(err.is_pack());
        assert_eq!(
            err.to_string(),
            "Cannot convert member \"numtasks\" to an integer. Got abc"
        );
    }

    #[test]
    fn key_modification_error() {
        let err = Error::key_modification("jobid", "Job");
        assert_eq!(
            err.to_string(),
            "cannot modify member 'jobid' of Job object, because it is a key member and its record is in the database."
        );
    }

    #[test]
    fn join_errors() {
        let err = Error::unjoinable("Task", "Job");
        assert!(err.is_join());
        assert_eq!(err.to_string(), "unable to join Task with 'Job'");

        assert_eq!(
            Error::join_in_update().to_string(),
            "update queries cannot contain table joins"
        );
        assert_eq!(
            Error::join_in_delete().to_string(),
            "delete queries cannot contain table joins"
        );
    }

    #[test]
    fn storage_errors_are_distinct() {
        let err = Error::storage_connection("no such file: farm.db");
        assert!(err.is_storage());
        assert!(!err.is_read_only());

        let err = Error::syntax("parentheses mismatch").context(err!("parsing where"));
        assert!(!err.is_storage());

        let err = Error::storage_read_only("INSERT INTO Job").context(err!("insert"));
        assert!(err.is_storage());
    }

    #[test]
    fn too_many_records_message() {
        let err = Error::too_many_records("Job", 2, "user=joe");
        assert!(err.is_too_many_records());
        assert_eq!(err.to_string(), "expected one Job record matching user=joe, found 2");
    }
}
