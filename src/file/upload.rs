//! Streaming upload pipeline for Burrow.
//!
//! One multipart body carries an optional `parent` text part and exactly one
//! `file` part. The file is written in two phases: a pending stub is
//! inserted as soon as the part starts, the blob is streamed to disk, and
//! the record is finalized once the body ends. Any failure before
//! finalization removes both the partial blob and the stub.
//!
//! Admission is check-then-act: two concurrent uploads for the same owner
//! may both pass the quota check and overshoot it by at most one ceiling.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use super::folder::FolderRepository;
use super::metadata::{FileRecord, FileRepository, FileState, FileUpdate, NewFile};
use super::sniff::detect_content_type;
use super::storage::{blob_path, BlobStore};
use super::{normalize_parent, MAX_PARENT_FIELD_LEN, SNIFF_LEN};
use crate::db::UserRepository;
use crate::{BurrowError, Result};

/// Name used when the client sends a file part without a usable filename.
const UNTITLED: &str = "untitled";

/// Upload protocol and admission failures.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The caller has no user record.
    #[error("user not found")]
    UnknownOwner,

    /// The caller's quota is already used up.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// The file part exceeds the remaining quota or the size limit.
    #[error("file exceeds the upload limit of {limit} bytes")]
    PayloadTooLarge {
        /// Byte ceiling that applied to this upload.
        limit: u64,
    },

    /// More than one `file` part in the body.
    #[error("only one file may be uploaded per request")]
    MultipleFilesNotAllowed,

    /// The body ended without a `file` part.
    #[error("no file part in request")]
    MissingFile,

    /// The `parent` part is longer than allowed.
    #[error("parent field exceeds {MAX_PARENT_FIELD_LEN} bytes")]
    ParentFieldTooLong,

    /// The request body exceeds the transport limit.
    #[error("request body too large")]
    BodyTooLarge,

    /// The multipart body could not be parsed.
    #[error("malformed multipart body: {0}")]
    Malformed(String),
}

/// A file whose stub exists and whose blob may be partially written.
#[derive(Debug)]
struct Staged {
    id: String,
    rel: String,
    name: String,
    extension: String,
    mime_type: String,
    size: u64,
}

/// State accumulated while scanning parts.
#[derive(Debug, Default)]
struct Scan {
    parent: String,
    staged: Option<Staged>,
}

/// Upload ingestion over the metadata store and blob store.
pub struct UploadPipeline<'a> {
    pool: &'a SqlitePool,
    blobs: &'a BlobStore,
    max_file_size: u64,
}

impl<'a> UploadPipeline<'a> {
    /// Create a new pipeline.
    pub fn new(pool: &'a SqlitePool, blobs: &'a BlobStore, max_file_size: u64) -> Self {
        Self {
            pool,
            blobs,
            max_file_size,
        }
    }

    /// Check the owner's quota and return the byte ceiling for one upload.
    pub async fn admit(&self, owner: i64) -> Result<u64> {
        let usage = UserRepository::new(self.pool)
            .usage(owner)
            .await?
            .ok_or(UploadError::UnknownOwner)?;

        if usage.is_exhausted() {
            debug!(owner, quota = usage.quota, used = usage.space_used, "Upload refused");
            return Err(UploadError::QuotaExceeded.into());
        }

        Ok(usage.upload_ceiling(self.max_file_size))
    }

    /// Ingest one multipart body and return the completed file record.
    pub async fn run(&self, owner: i64, mut multipart: Multipart) -> Result<FileRecord> {
        let ceiling = self.admit(owner).await?;

        let mut scan = Scan::default();
        if let Err(e) = self.scan(owner, &mut multipart, ceiling, &mut scan).await {
            if let Some(staged) = scan.staged.take() {
                self.rollback(owner, &staged).await;
            }
            return Err(e);
        }

        let staged = scan.staged.take().ok_or(UploadError::MissingFile)?;
        self.finalize(owner, &scan.parent, staged).await
    }

    async fn scan(
        &self,
        owner: i64,
        multipart: &mut Multipart,
        ceiling: u64,
        scan: &mut Scan,
    ) -> Result<()> {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let part = field.name().map(str::to_owned);
            match part.as_deref() {
                Some("parent") => {
                    scan.parent = read_parent(field).await?;
                }
                Some("file") => {
                    if scan.staged.is_some() {
                        return Err(UploadError::MultipleFilesNotAllowed.into());
                    }
                    self.ingest(owner, field, ceiling, scan).await?;
                }
                other => {
                    debug!(owner, part = ?other, "Skipping multipart part");
                }
            }
        }
        Ok(())
    }

    /// Sniff, stub, and stream one file part to its blob.
    ///
    /// The staged entry is recorded right after the stub is inserted, so the
    /// caller can roll back whatever happens afterwards.
    async fn ingest(
        &self,
        owner: i64,
        mut field: Field<'_>,
        ceiling: u64,
        scan: &mut Scan,
    ) -> Result<()> {
        let name = file_name(field.file_name().unwrap_or_default());
        let extension = file_extension(&name);

        let mut head = Vec::with_capacity(SNIFF_LEN);
        while head.len() < SNIFF_LEN {
            match field.chunk().await.map_err(multipart_error)? {
                Some(chunk) => head.extend_from_slice(&chunk),
                None => break,
            }
        }
        if head.len() as u64 > ceiling {
            return Err(UploadError::PayloadTooLarge { limit: ceiling }.into());
        }
        let mime_type = detect_content_type(&head).to_string();

        let stub = FileRepository::new(self.pool)
            .create(
                &NewFile::new(owner, &name)
                    .with_extension(&extension)
                    .with_mime_type(&mime_type)
                    .with_parent(&scan.parent),
            )
            .await?;
        debug!(owner, file_id = %stub.id, mime = %mime_type, "Created pending file");

        let staged = scan.staged.insert(Staged {
            rel: blob_path(owner, &stub.id),
            id: stub.id,
            name,
            extension,
            mime_type,
            size: 0,
        });

        self.blobs.mkdir(&owner.to_string()).await?;
        let mut blob = self.blobs.create(&staged.rel).await?;

        blob.write_all(&head).await?;
        let mut total = head.len() as u64;
        drop(head);

        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            total += chunk.len() as u64;
            if total > ceiling {
                return Err(UploadError::PayloadTooLarge { limit: ceiling }.into());
            }
            blob.write_all(&chunk).await?;
        }
        blob.flush().await?;

        staged.size = total;
        Ok(())
    }

    /// Mark the record complete under its parent, and account usage.
    ///
    /// The parent check is part of the finalizing update, so a folder
    /// deleted concurrently cannot end up with a complete child.
    async fn finalize(&self, owner: i64, parent: &str, staged: Staged) -> Result<FileRecord> {
        let size = staged.size as i64;
        let update = FileUpdate::new()
            .size(size)
            .extension(&staged.extension)
            .name(&staged.name)
            .mime_type(&staged.mime_type)
            .parent(parent)
            .state(FileState::Complete);

        let record = match FileRepository::new(self.pool)
            .update(&staged.id, owner, &update)
            .await
        {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.rollback(owner, &staged).await;
                return Err(self.finalize_miss(owner, parent, &staged.id).await);
            }
            Err(e) => {
                self.rollback(owner, &staged).await;
                return Err(e);
            }
        };

        if let Err(e) = UserRepository::new(self.pool)
            .adjust_space_used(owner, size)
            .await
        {
            // The file is stored; only the counter drifted.
            warn!(owner, file_id = %record.id, size, error = %e, "Failed to update space used");
            return Err(e);
        }

        info!(owner, file_id = %record.id, size, "File uploaded");
        Ok(record)
    }

    /// Explain why the finalizing update matched no row.
    async fn finalize_miss(&self, owner: i64, parent: &str, file_id: &str) -> BurrowError {
        if !parent.is_empty() {
            match FolderRepository::new(self.pool).get(parent, owner).await {
                Ok(None) => return BurrowError::ParentNotFound(parent.to_string()),
                Ok(Some(_)) => {}
                Err(e) => return e,
            }
        }
        BurrowError::Database(format!(
            "pending file {file_id} disappeared before finalization"
        ))
    }

    /// Remove a partial blob and its stub. Failures are logged only.
    async fn rollback(&self, owner: i64, staged: &Staged) {
        warn!(owner, file_id = %staged.id, "Rolling back upload");

        match self.blobs.remove(&staged.rel).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                error!(owner, file_id = %staged.id, error = %e, "Failed to remove partial blob");
            }
        }

        if let Err(e) = FileRepository::new(self.pool).delete(&staged.id, owner).await {
            error!(owner, file_id = %staged.id, error = %e, "Failed to delete pending file");
        }
    }
}

/// Read the `parent` part, bounded to [`MAX_PARENT_FIELD_LEN`] bytes.
async fn read_parent(mut field: Field<'_>) -> Result<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if buf.len() + chunk.len() > MAX_PARENT_FIELD_LEN {
            return Err(UploadError::ParentFieldTooLong.into());
        }
        buf.extend_from_slice(&chunk);
    }

    let raw = String::from_utf8(buf)
        .map_err(|_| UploadError::Malformed("parent is not valid UTF-8".to_string()))?;
    Ok(normalize_parent(&raw))
}

fn multipart_error(e: MultipartError) -> BurrowError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::BodyTooLarge.into()
    } else {
        UploadError::Malformed(e.body_text()).into()
    }
}

/// Basename of a client-supplied filename.
///
/// Both `/` and `\` count as separators.
pub fn file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        UNTITLED.to_string()
    } else {
        base.to_string()
    }
}

/// Lower-cased extension of a name without the dot.
///
/// Empty when there is no dot or the only dot is leading.
pub fn file_extension(name: &str) -> String {
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => name[idx + 1..].to_lowercase(),
    }
}
