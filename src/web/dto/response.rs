//! Response DTOs for Web API.

use serde::Serialize;

use crate::db::UserUsage;
use crate::file::{Breadcrumb, FileRecord, Folder, FolderContents, ROOT_FOLDER_ID};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Parent reference as seen by clients: the ROOT sentinel for the top level.
fn parent_for_client(parent: &str) -> String {
    if parent.is_empty() {
        ROOT_FOLDER_ID.to_string()
    } else {
        parent.to_string()
    }
}

/// File metadata response.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    /// File ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Extension (lower-cased, no dot).
    pub extension: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Parent folder ID.
    pub parent: String,
    /// Owning user ID.
    pub owner_id: i64,
    /// Creation time (RFC 3339).
    pub created_at: String,
}

impl From<FileRecord> for FileResponse {
    fn from(file: FileRecord) -> Self {
        Self {
            parent: parent_for_client(&file.parent),
            id: file.id,
            name: file.name,
            extension: file.extension,
            mime_type: file.mime_type,
            size: file.size,
            owner_id: file.owner_id,
            created_at: file.created_at,
        }
    }
}

/// Folder response.
#[derive(Debug, Serialize)]
pub struct FolderResponse {
    /// Folder ID.
    pub id: String,
    /// Folder name.
    pub name: String,
    /// Parent folder ID.
    pub parent: String,
    /// Owning user ID.
    pub owner_id: i64,
    /// Creation time (RFC 3339).
    pub created_at: String,
}

impl From<Folder> for FolderResponse {
    fn from(folder: Folder) -> Self {
        Self {
            parent: parent_for_client(&folder.parent),
            id: folder.id,
            name: folder.name,
            owner_id: folder.owner_id,
            created_at: folder.created_at,
        }
    }
}

/// Breadcrumb entry.
#[derive(Debug, Serialize)]
pub struct BreadcrumbResponse {
    /// Display label.
    pub label: String,
    /// Folder ID.
    pub folder_id: String,
}

impl From<Breadcrumb> for BreadcrumbResponse {
    fn from(crumb: Breadcrumb) -> Self {
        Self {
            label: crumb.label,
            folder_id: crumb.folder_id,
        }
    }
}

/// Folder listing response.
#[derive(Debug, Serialize)]
pub struct FolderContentsResponse {
    /// Complete child files.
    pub files: Vec<FileResponse>,
    /// Child folders.
    pub folders: Vec<FolderResponse>,
    /// Path back to the top level, nearest ancestor first.
    pub breadcrumbs: Vec<BreadcrumbResponse>,
}

impl From<FolderContents> for FolderContentsResponse {
    fn from(contents: FolderContents) -> Self {
        Self {
            files: contents.files.into_iter().map(Into::into).collect(),
            folders: contents.folders.into_iter().map(Into::into).collect(),
            breadcrumbs: contents.breadcrumbs.into_iter().map(Into::into).collect(),
        }
    }
}

/// Quota and usage response.
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    /// Quota in bytes (0 = unlimited).
    pub quota: i64,
    /// Bytes used.
    pub space_used: i64,
    /// Bytes left, absent when unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
}

impl From<UserUsage> for UsageResponse {
    fn from(usage: UserUsage) -> Self {
        Self {
            quota: usage.quota,
            space_used: usage.space_used,
            remaining: usage.remaining(),
        }
    }
}

/// Generic message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

impl MessageResponse {
    /// Create a new message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
