//! Collaborator abstractions for issue submission.
//!
//! The submission workflow talks to two external services: an object store
//! for attachments and a record store for issue rows. Backends implement
//! these traits; see [`crate::storage`] for the local ones and
//! [`crate::remote`] for the REST one.

use async_trait::async_trait;
use thiserror::Error;

use crate::issue::{Attachment, PersistedIssueInput};

/// Name of the table issues are inserted into.
pub const ISSUES_TABLE: &str = "issues";

/// Errors reported by a collaborator.
///
/// These are carried as the cause of a failed submission and are not
/// otherwise interpreted.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object exceeds the store's size limit.
    #[error("file is too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Size of the rejected object.
        size: u64,
        /// Configured limit.
        limit: u64,
    },

    /// The object path is empty or escapes the bucket.
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    /// The record store has no such table.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// The service answered with a non-success status.
    #[error("service rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The request never got an answer.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local file system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Local database failure.
    #[error("database error: {0}")]
    Database(#[from] crate::error::Error),
}

/// Receipt for an object the store has accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Path of the object inside the bucket.
    pub path: String,
}

/// Binary blob storage for attachments.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name, for logging.
    fn name(&self) -> &'static str;

    /// Store `attachment` under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects or fails to write the object.
    async fn upload(
        &self,
        path: &str,
        attachment: &Attachment,
    ) -> std::result::Result<StoredObject, StoreError>;

    /// The publicly retrievable URL of the object at `path`.
    fn public_url(&self, path: &str) -> String;
}

/// Structured persistence for issue records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name, for logging.
    fn name(&self) -> &'static str;

    /// Insert one record into `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is unknown or the insert fails.
    async fn insert(
        &self,
        table: &str,
        record: &PersistedIssueInput,
    ) -> std::result::Result<(), StoreError>;
}

/// Check an object path before writing it.
///
/// Paths are relative, `/`-separated, and may not contain empty, `.` or
/// `..` segments.
pub(crate) fn validate_object_path(path: &str) -> std::result::Result<(), StoreError> {
    let bad_segment = path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if path.is_empty() || bad_segment || path.contains('\\') {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_object_path_accepts_scoped_paths() {
        assert!(validate_object_path("user-1/1700000000000-0.jpg").is_ok());
        assert!(validate_object_path("file").is_ok());
    }

    #[test]
    fn test_validate_object_path_rejects_escapes() {
        for path in ["", "/abs.jpg", "a//b", "../x", "a/./b", "a/..", "a\\b", "a/"] {
            assert!(
                matches!(validate_object_path(path), Err(StoreError::InvalidPath(_))),
                "accepted {path:?}"
            );
        }
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::TooLarge {
            size: 20,
            limit: 10,
        };
        assert!(err.to_string().contains("20 bytes"));

        let err = StoreError::Rejected {
            status: 413,
            message: "Payload too large".to_string(),
        };
        assert!(err.to_string().contains("413"));
        assert!(err.to_string().contains("Payload too large"));

        let err = StoreError::UnknownTable("users".to_string());
        assert_eq!(err.to_string(), "unknown table: users");
    }
}
