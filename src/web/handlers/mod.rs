//! API handlers for the Burrow Web API.

pub mod file;
pub mod folder;
pub mod usage;

pub use file::*;
pub use folder::*;
pub use usage::*;

use std::sync::Arc;

use crate::file::BlobStore;
use crate::Database;

/// Shared database handle.
pub type SharedDatabase = Arc<Database>;

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: SharedDatabase,
    /// Blob store for file contents.
    pub blobs: BlobStore,
    /// Maximum size of a single uploaded file in bytes.
    pub max_file_size: u64,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: SharedDatabase, blobs: BlobStore, max_file_size: u64) -> Self {
        Self {
            db,
            blobs,
            max_file_size,
        }
    }
}
