use super::Error;

/// Error raised by the storage backend.
///
/// Storage errors are never retried by farmql; callers decide whether a
/// failed statement is worth resubmitting.
#[derive(Debug)]
pub(super) struct StorageError {
    kind: StorageKind,
    message: Box<str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageKind {
    DuplicateInsert,
    QueryFailed,
    Connection,
    ReadOnly,
}

impl StorageError {
    pub(super) fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let what = match self.kind {
            StorageKind::DuplicateInsert => "duplicate insert",
            StorageKind::QueryFailed => "query failed",
            StorageKind::Connection => "connection failed",
            StorageKind::ReadOnly => "database is read-only",
        };
        write!(f, "storage error: {what}")?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        let mut source = self.source();
        while let Some(err) = source {
            write!(f, ": {}", err)?;
            source = err.source();
        }
        Ok(())
    }
}

impl Error {
    fn storage(kind: StorageKind, message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Storage(StorageError {
            kind,
            message: message.into().into(),
            source: None,
        }))
    }

    /// Wraps a driver library error as a failed query.
    pub fn storage_driver(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::from(super::ErrorKind::Storage(StorageError {
            kind: StorageKind::QueryFailed,
            message: "".into(),
            source: Some(Box::new(err)),
        }))
    }

    pub fn storage_duplicate_insert(message: impl Into<String>) -> Error {
        Error::storage(StorageKind::DuplicateInsert, message)
    }

    pub fn storage_connection(message: impl Into<String>) -> Error {
        Error::storage(StorageKind::Connection, message)
    }

    pub fn storage_read_only(message: impl Into<String>) -> Error {
        Error::storage(StorageKind::ReadOnly, message)
    }

    /// Returns `true` if the store rejected an insert because the key exists.
    pub fn is_duplicate_insert(&self) -> bool {
        matches!(
            self.kind(),
            super::ErrorKind::Storage(StorageError {
                kind: StorageKind::DuplicateInsert,
                ..
            })
        )
    }

    pub fn is_read_only(&self) -> bool {
        matches!(
            self.kind(),
            super::ErrorKind::Storage(StorageError {
                kind: StorageKind::ReadOnly,
                ..
            })
        )
    }
}
