//! Error types for Burrow.

use thiserror::Error;

use crate::file::{BlobError, UploadError};

/// Common error type for Burrow.
#[derive(Error, Debug)]
pub enum BurrowError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob store error.
    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),

    /// Upload pipeline error.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The declared parent folder does not exist for the owner.
    #[error("parent folder {0} not found")]
    ParentNotFound(String),

    /// A folder still has child files or folders.
    #[error("folder {0} is not empty")]
    FolderNotEmpty(String),

    /// A folder's parent chain revisits a folder or exceeds the owner's folder count.
    #[error("folder cycle detected at {0}")]
    FolderCycle(String),

    /// A folder's parent chain references a folder that does not exist.
    #[error("folder {0} references missing parent {1}")]
    BrokenFolderChain(String, String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for BurrowError {
    fn from(e: sqlx::Error) -> Self {
        BurrowError::Database(e.to_string())
    }
}

/// Result type alias for Burrow operations.
pub type Result<T> = std::result::Result<T, BurrowError>;
