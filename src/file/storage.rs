//! Blob storage for Burrow.
//!
//! A [`BlobStore`] is jailed to one root directory. Callers only ever pass
//! relative paths; anything that could escape the root is rejected before
//! touching the filesystem.
//!
//! ```text
//! {root}/
//! ├── 1/
//! │   └── 0b7c3e2a-6f1d-4c8e-9a51-2d4e8f0c1b3a
//! └── 2/
//!     └── 5e9d1f7a-3b2c-4d6e-8f0a-1c2b3d4e5f6a
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;

/// Errors raised by the blob store.
#[derive(Error, Debug)]
pub enum BlobError {
    /// The relative path is empty, absolute, or escapes the root.
    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    /// The blob (or directory) does not exist.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// Any other filesystem failure.
    #[error("blob I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BlobError {
    /// Whether this error means the path was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound(_))
    }
}

type BlobResult<T> = std::result::Result<T, BlobError>;

/// Build the relative blob path of a file: `<owner>/<file_id>`.
pub fn blob_path(owner: i64, file_id: &str) -> String {
    format!("{owner}/{file_id}")
}

/// Filesystem capability rooted at one directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a new BlobStore over the given root.
    ///
    /// The root directory will be created if it doesn't exist.
    pub async fn new(root: impl Into<PathBuf>) -> BlobResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Get the root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create (or truncate) a blob for writing.
    pub async fn create(&self, rel: &str) -> BlobResult<fs::File> {
        let path = self.resolve(rel)?;
        fs::File::create(&path).await.map_err(|e| map_io(e, rel))
    }

    /// Open an existing blob for reading.
    pub async fn open(&self, rel: &str) -> BlobResult<fs::File> {
        let path = self.resolve(rel)?;
        fs::File::open(&path).await.map_err(|e| map_io(e, rel))
    }

    /// Remove a blob.
    pub async fn remove(&self, rel: &str) -> BlobResult<()> {
        let path = self.resolve(rel)?;
        fs::remove_file(&path).await.map_err(|e| map_io(e, rel))
    }

    /// Create a directory (and its parents) if missing.
    pub async fn mkdir(&self, rel: &str) -> BlobResult<()> {
        let path = self.resolve(rel)?;
        fs::create_dir_all(&path).await.map_err(|e| map_io(e, rel))
    }

    /// Check whether a path exists.
    pub async fn exists(&self, rel: &str) -> BlobResult<bool> {
        let path = self.resolve(rel)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Size of a blob in bytes.
    pub async fn len(&self, rel: &str) -> BlobResult<u64> {
        let path = self.resolve(rel)?;
        let meta = fs::metadata(&path).await.map_err(|e| map_io(e, rel))?;
        Ok(meta.len())
    }

    /// Join a validated relative path onto the root.
    fn resolve(&self, rel: &str) -> BlobResult<PathBuf> {
        if rel.is_empty() {
            return Err(BlobError::InvalidPath(rel.to_string()));
        }

        let mut path = self.root.clone();
        let mut parts = 0;
        for component in Path::new(rel).components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    parts += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(BlobError::InvalidPath(rel.to_string()));
                }
            }
        }

        if parts == 0 {
            return Err(BlobError::InvalidPath(rel.to_string()));
        }
        Ok(path)
    }
}

fn map_io(e: io::Error, rel: &str) -> BlobError {
    if e.kind() == io::ErrorKind::NotFound {
        BlobError::NotFound(rel.to_string())
    } else {
        BlobError::Io(e)
    }
}
