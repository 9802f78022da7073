//! Folder tree resolution for Burrow.
//!
//! Listing, ancestor walks and breadcrumbs over one owner's folder forest.
//! Ancestor walks are explicit bounded loops: a chain can be at most as long
//! as the owner's folder count, so anything longer is a cycle.

use std::collections::HashSet;

use sqlx::SqlitePool;
use tracing::{debug, error};

use super::folder::{Folder, FolderRepository, NewFolder};
use super::metadata::{FileRecord, FileRepository};
use super::{is_root, normalize_parent, validate_name, ROOT_FOLDER_ID};
use crate::{BurrowError, Result};

/// One step of the navigation path back to the top level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Display label (`/` for the top level).
    pub label: String,
    /// Folder ID (the ROOT sentinel for the top level).
    pub folder_id: String,
}

impl Breadcrumb {
    /// Breadcrumb pointing at the top level.
    pub fn root() -> Self {
        Self {
            label: "/".to_string(),
            folder_id: ROOT_FOLDER_ID.to_string(),
        }
    }
}

/// Contents of one folder.
#[derive(Debug, Clone)]
pub struct FolderContents {
    /// Child folders, ordered by name then id.
    pub folders: Vec<Folder>,
    /// Complete child files, ordered by name then id.
    pub files: Vec<FileRecord>,
    /// Path back to the top level, nearest ancestor first.
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// Folder hierarchy queries and mutations.
pub struct FolderResolver<'a> {
    folders: FolderRepository<'a>,
    files: FileRepository<'a>,
}

impl<'a> FolderResolver<'a> {
    /// Create a new FolderResolver with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            folders: FolderRepository::new(pool),
            files: FileRepository::new(pool),
        }
    }

    /// List the child folders and complete files of a folder.
    pub async fn list_children(&self, owner: i64, folder_id: &str) -> Result<FolderContents> {
        let parent = normalize_parent(folder_id);
        if !parent.is_empty() && self.folders.get(&parent, owner).await?.is_none() {
            return Err(BurrowError::NotFound("folder".to_string()));
        }

        let folders = self.folders.list_by_parent(owner, &parent).await?;
        let files = self.files.list_by_parent(owner, &parent).await?;
        let breadcrumbs = self.breadcrumbs(owner, &parent).await?;

        debug!(
            owner,
            folder = %parent,
            folders = folders.len(),
            files = files.len(),
            "Listed folder"
        );

        Ok(FolderContents {
            folders,
            files,
            breadcrumbs,
        })
    }

    /// Walk from a folder up to the top level.
    ///
    /// Returns `[folder, parent, ..., top-level folder]`, or an empty list
    /// for the root itself.
    pub async fn ancestors(&self, owner: i64, folder_id: &str) -> Result<Vec<Folder>> {
        let start = normalize_parent(folder_id);
        if start.is_empty() {
            return Ok(Vec::new());
        }

        let first = self
            .folders
            .get(&start, owner)
            .await?
            .ok_or_else(|| BurrowError::NotFound("folder".to_string()))?;

        let bound = self.folders.count(owner).await?.max(1) as usize;
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut current = first;

        loop {
            if !seen.insert(current.id.clone()) || chain.len() >= bound {
                error!(owner, folder = %current.id, "Folder cycle detected");
                return Err(BurrowError::FolderCycle(current.id));
            }

            let parent = current.parent.clone();
            chain.push(current);

            if parent.is_empty() {
                return Ok(chain);
            }

            current = match self.folders.get(&parent, owner).await? {
                Some(folder) => folder,
                None => {
                    let child = chain.last().map(|f| f.id.clone()).unwrap_or_default();
                    error!(owner, folder = %child, missing = %parent, "Broken folder chain");
                    return Err(BurrowError::BrokenFolderChain(child, parent));
                }
            };
        }
    }

    /// Navigation path from a folder back to the top level.
    ///
    /// The queried folder itself is not included. The root yields no
    /// breadcrumbs; any other folder ends with the `/` entry.
    pub async fn breadcrumbs(&self, owner: i64, folder_id: &str) -> Result<Vec<Breadcrumb>> {
        if is_root(folder_id) {
            return Ok(Vec::new());
        }

        let mut crumbs: Vec<Breadcrumb> = self
            .ancestors(owner, folder_id)
            .await?
            .into_iter()
            .skip(1)
            .map(|f| Breadcrumb {
                label: f.name,
                folder_id: f.id,
            })
            .collect();
        crumbs.push(Breadcrumb::root());

        Ok(crumbs)
    }

    /// Create a folder under `parent` (root when empty or the ROOT sentinel).
    ///
    /// The parent check runs inside the insert, so a concurrent delete of
    /// the parent either sees the new child or makes this fail.
    pub async fn create_folder(&self, owner: i64, name: &str, parent: &str) -> Result<Folder> {
        let name = validate_name(name)?;
        let parent = normalize_parent(parent);

        let folder = self
            .folders
            .create(&NewFolder::new(owner, name).with_parent(parent))
            .await?;
        debug!(owner, folder = %folder.id, "Created folder");
        Ok(folder)
    }

    /// Delete an empty folder.
    pub async fn delete_folder(&self, owner: i64, folder_id: &str) -> Result<()> {
        let id = normalize_parent(folder_id);
        if id.is_empty() || self.folders.get(&id, owner).await?.is_none() {
            return Err(BurrowError::NotFound("folder".to_string()));
        }

        if self.folders.delete_if_empty(&id, owner).await? {
            debug!(owner, folder = %id, "Deleted folder");
            return Ok(());
        }

        // Either it has children, or it vanished concurrently.
        if self.folders.get(&id, owner).await?.is_none() {
            return Err(BurrowError::NotFound("folder".to_string()));
        }
        Err(BurrowError::FolderNotEmpty(id))
    }
}
