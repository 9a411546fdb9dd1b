//! Error types for civicreport.
//!
//! This module defines the crate-wide error type used by configuration,
//! storage and session handling. The submission workflow and the collaborator
//! traits carry their own, narrower taxonomies (see
//! [`crate::submission::SubmitError`] and [`crate::store::StoreError`]).

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for civicreport operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Domain Errors ===
    /// A department name or slug did not match any known department.
    #[error("unknown department: {0}")]
    UnknownDepartment(String),

    /// Coordinates were outside the valid latitude/longitude range.
    #[error("invalid location: {message}")]
    InvalidLocation {
        /// Description of the problem.
        message: String,
    },

    // === Session Errors ===
    /// The persisted session file could not be read or written.
    #[error("session file {path}: {message}")]
    Session {
        /// Path to the session file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    // === Remote Errors ===
    /// An HTTP request to the remote backend failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read an attachment from disk.
    #[error("failed to read attachment {path}: {source}")]
    AttachmentRead {
        /// Path of the attachment.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// The operation is not available with the configured backend.
    #[error("not supported by the {backend} backend: {operation}")]
    Unsupported {
        /// Name of the configured backend.
        backend: &'static str,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for civicreport operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a session file error.
    #[must_use]
    pub fn session(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Session {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid location error.
    #[must_use]
    pub fn invalid_location(message: impl Into<String>) -> Self {
        Self::InvalidLocation {
            message: message.into(),
        }
    }

    /// Check if this error is a configuration problem.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad(_) | Self::ConfigValidation { .. })
    }
}
