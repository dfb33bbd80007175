use std::time::Duration;

use thiserror::Error;

/// Errors from draft storage backends.
///
/// Messages describe the failure only. They never include form content,
/// which may hold patient data.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("draft not found")]
    NotFound,

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("encryption error")]
    Encryption,

    #[error("database error: {0}")]
    Database(String),

    #[error("save timed out after {0:?}")]
    Timeout(Duration),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Database("disk I/O error".to_string());
        assert_eq!(err.to_string(), "database error: disk I/O error");
    }

    #[test]
    fn test_timeout_display() {
        let err = StorageError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "save timed out after 30s");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StorageError = io.into();
        assert!(matches!(err, StorageError::Io(ref msg) if msg.contains("denied")));
    }
}
