//! File service for Burrow.
//!
//! Operations on complete files: flat listing, rename, download and
//! delete, plus the caller's quota state.

use sqlx::SqlitePool;
use tokio::fs;
use tracing::{info, warn};

use super::metadata::{FileRecord, FileRepository, FileUpdate};
use super::storage::{blob_path, BlobStore};
use super::upload::UploadError;
use super::validate_name;
use crate::db::{UserRepository, UserUsage};
use crate::{BurrowError, Result};

/// An opened download: the record plus a reader over its blob.
#[derive(Debug)]
pub struct Download {
    /// File metadata.
    pub record: FileRecord,
    /// Open blob.
    pub blob: fs::File,
}

/// Service for file operations.
pub struct FileService<'a> {
    pool: &'a SqlitePool,
    blobs: &'a BlobStore,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(pool: &'a SqlitePool, blobs: &'a BlobStore) -> Self {
        Self { pool, blobs }
    }

    fn files(&self) -> FileRepository<'a> {
        FileRepository::new(self.pool)
    }

    /// All complete files of the owner.
    pub async fn list_files(&self, owner: i64) -> Result<Vec<FileRecord>> {
        self.files().list(owner).await
    }

    /// Get one complete file.
    pub async fn get_file(&self, owner: i64, file_id: &str) -> Result<FileRecord> {
        self.files()
            .get_complete(file_id, owner)
            .await?
            .ok_or_else(|| BurrowError::NotFound("file".to_string()))
    }

    /// Change the display name of a file. The extension is kept.
    pub async fn rename(&self, owner: i64, file_id: &str, new_name: &str) -> Result<FileRecord> {
        let name = validate_name(new_name)?;
        self.get_file(owner, file_id).await?;

        let record = self
            .files()
            .update(file_id, owner, &FileUpdate::new().name(name))
            .await?
            .ok_or_else(|| BurrowError::NotFound("file".to_string()))?;

        info!(owner, file_id, "File renamed");
        Ok(record)
    }

    /// Open a file for download.
    pub async fn open_download(&self, owner: i64, file_id: &str) -> Result<Download> {
        let record = self.get_file(owner, file_id).await?;

        let blob = match self.blobs.open(&blob_path(owner, &record.id)).await {
            Ok(blob) => blob,
            Err(e) if e.is_not_found() => {
                warn!(owner, file_id, "Blob missing for complete file");
                return Err(BurrowError::NotFound("blob".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Download { record, blob })
    }

    /// Delete a file and release its bytes from the owner's usage.
    ///
    /// A blob that is already gone does not prevent the delete.
    pub async fn delete(&self, owner: i64, file_id: &str) -> Result<FileRecord> {
        let record = self.get_file(owner, file_id).await?;

        match self.blobs.remove(&blob_path(owner, &record.id)).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(owner, file_id, "Blob already missing on delete");
            }
            Err(e) => return Err(e.into()),
        }

        if !self.files().delete(&record.id, owner).await? {
            return Err(BurrowError::NotFound("file".to_string()));
        }

        if let Err(e) = UserRepository::new(self.pool)
            .adjust_space_used(owner, -record.size)
            .await
        {
            warn!(owner, file_id, size = record.size, error = %e, "Failed to update space used");
            return Err(e);
        }

        info!(owner, file_id, size = record.size, "File deleted");
        Ok(record)
    }

    /// Quota state of the owner.
    pub async fn usage(&self, owner: i64) -> Result<UserUsage> {
        UserRepository::new(self.pool)
            .usage(owner)
            .await?
            .ok_or_else(|| UploadError::UnknownOwner.into())
    }
}
