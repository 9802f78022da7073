//! File management module for Burrow.
//!
//! This module provides per-user file storage:
//! - Jailed blob store keyed by owner and file id
//! - File and folder metadata over SQLite
//! - Folder tree resolution (listing, ancestor walk, breadcrumbs)
//! - Streaming upload pipeline with quota admission and rollback

mod folder;
mod metadata;
mod resolver;
mod service;
mod sniff;
mod storage;
mod upload;

pub use folder::{Folder, FolderRepository, NewFolder};
pub use metadata::{FileRecord, FileRepository, FileState, FileUpdate, NewFile};
pub use resolver::{Breadcrumb, FolderContents, FolderResolver};
pub use service::{Download, FileService};
pub use sniff::detect_content_type;
pub use storage::{blob_path, BlobError, BlobStore};
pub use upload::{file_extension, file_name, UploadError, UploadPipeline};

/// Reserved folder id naming the top level. No folder row backs it.
pub const ROOT_FOLDER_ID: &str = "c32af1cc-aba9-4878-a305-5006dc7a5b76";

/// Default maximum file size (200MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// Number of leading bytes inspected by content sniffing.
pub const SNIFF_LEN: usize = 512;

/// Maximum size of the `parent` multipart field in bytes.
pub const MAX_PARENT_FIELD_LEN: usize = 1024;

/// Maximum length for file and folder names (in characters).
pub const MAX_NAME_LENGTH: usize = 255;

/// Normalize a parent folder reference for storage.
///
/// The ROOT sentinel and blank input both map to the empty string.
pub fn normalize_parent(parent: &str) -> String {
    let parent = parent.trim();
    if parent == ROOT_FOLDER_ID {
        String::new()
    } else {
        parent.to_string()
    }
}

/// Whether a (normalized or raw) folder reference names the top level.
pub fn is_root(folder_id: &str) -> bool {
    let folder_id = folder_id.trim();
    folder_id.is_empty() || folder_id == ROOT_FOLDER_ID
}

/// Validate a display name for a file or folder.
///
/// Returns the trimmed name.
pub fn validate_name(name: &str) -> crate::Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(crate::BurrowError::Validation(
            "name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(crate::BurrowError::Validation(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(crate::BurrowError::Validation(
            "name must not contain path separators".to_string(),
        ));
    }
    Ok(name.to_string())
}
