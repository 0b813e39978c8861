use thiserror::Error;

/// Every way a fetch, parse or bookmark lookup can fail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComicError {
    #[error("IO error: {0}")]
    Network(String),
    #[error("Comic doesn't exist: {0}")]
    NotFound(String),
    #[error("Data returned from website didn't match expected format: {0}")]
    MalformedData(String),
    #[error("Loading was cancelled")]
    Cancelled,
    #[error("Bookmark storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// Fieldless mirror of [`ComicError`] for callers that only switch on the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    NotFound,
    MalformedData,
    Cancelled,
    StorageUnavailable,
}

impl ComicError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComicError::Network(_) => ErrorKind::Network,
            ComicError::NotFound(_) => ErrorKind::NotFound,
            ComicError::MalformedData(_) => ErrorKind::MalformedData,
            ComicError::Cancelled => ErrorKind::Cancelled,
            ComicError::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ComicError::Cancelled)
    }
}

impl From<reqwest::Error> for ComicError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status == reqwest::StatusCode::NOT_FOUND => {
                ComicError::NotFound(err.to_string())
            }
            _ => ComicError::Network(err.to_string()),
        }
    }
}

impl From<std::io::Error> for ComicError {
    fn from(err: std::io::Error) -> Self {
        ComicError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ComicError {
    fn from(err: serde_json::Error) -> Self {
        ComicError::MalformedData(err.to_string())
    }
}

impl From<rusqlite::Error> for ComicError {
    fn from(err: rusqlite::Error) -> Self {
        ComicError::StorageUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ComicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(ComicError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            ComicError::NotFound("405".into()).kind(),
            ErrorKind::NotFound
        );
        assert!(ComicError::Cancelled.is_cancelled());
        assert!(!ComicError::Network("down".into()).is_cancelled());
    }

    #[test]
    fn sqlite_errors_become_storage_unavailable() {
        let err: ComicError = rusqlite::Error::InvalidQuery.into();
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
    }

    #[test]
    fn bad_json_is_malformed() {
        let err: ComicError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }
}
