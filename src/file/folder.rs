//! Folder types and repository for Burrow.

use sqlx::SqlitePool;

use crate::{BurrowError, Result};

/// A folder in a user's tree.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID (UUID v4).
    pub id: String,
    /// Folder name.
    pub name: String,
    /// Parent folder ID (empty for top-level folders).
    pub parent: String,
    /// Owning user ID.
    pub owner_id: i64,
    /// When the folder was created (RFC 3339).
    pub created_at: String,
}

impl Folder {
    /// Whether this folder sits at the top level.
    pub fn is_top_level(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Folder name.
    pub name: String,
    /// Parent folder ID (normalized, empty for top level).
    pub parent: String,
    /// Owning user ID.
    pub owner_id: i64,
}

impl NewFolder {
    /// Create a new top-level folder.
    pub fn new(owner_id: i64, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: String::new(),
            owner_id,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = parent.into();
        self
    }
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new folder with a fresh UUID.
    ///
    /// A non-empty parent must be a folder of the same owner at the moment
    /// of the insert; otherwise nothing is written and `ParentNotFound` is
    /// returned.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let id = uuid::Uuid::new_v4().to_string();

        let result = sqlx::query(
            "INSERT INTO folders (id, name, parent, owner_id)
             SELECT ?1, ?2, ?3, ?4
             WHERE ?3 = ''
                OR EXISTS (SELECT 1 FROM folders WHERE id = ?3 AND owner_id = ?4)",
        )
        .bind(&id)
        .bind(&folder.name)
        .bind(&folder.parent)
        .bind(folder.owner_id)
        .execute(self.pool)
        .await
        .map_err(|e| BurrowError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(BurrowError::ParentNotFound(folder.parent.clone()));
        }

        self.get(&id, folder.owner_id)
            .await?
            .ok_or_else(|| BurrowError::NotFound("folder".to_string()))
    }

    /// Get a folder of the owner.
    pub async fn get(&self, id: &str, owner_id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, name, parent, owner_id, created_at
             FROM folders WHERE id = ? AND owner_id = ?",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| BurrowError::Database(e.to_string()))?;

        Ok(folder)
    }

    /// List child folders of a parent (ordered by name, then id).
    pub async fn list_by_parent(&self, owner_id: i64, parent: &str) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT id, name, parent, owner_id, created_at
             FROM folders WHERE owner_id = ? AND parent = ? ORDER BY name, id",
        )
        .bind(owner_id)
        .bind(parent)
        .fetch_all(self.pool)
        .await
        .map_err(|e| BurrowError::Database(e.to_string()))?;

        Ok(folders)
    }

    /// Count all folders of the owner.
    pub async fn count(&self, owner_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM folders WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| BurrowError::Database(e.to_string()))?;

        Ok(count.0)
    }

    /// Delete a folder only if it has no child folders and no complete
    /// child files.
    ///
    /// Pending stubs do not count, matching what a listing shows. Child
    /// inserts and upload finalization check their parent inside the same
    /// statement that writes, so SQLite serializes them against this one.
    pub async fn delete_if_empty(&self, id: &str, owner_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM folders
             WHERE id = ?1 AND owner_id = ?2
               AND NOT EXISTS (SELECT 1 FROM folders WHERE owner_id = ?2 AND parent = ?1)
               AND NOT EXISTS (
                   SELECT 1 FROM files
                   WHERE owner_id = ?2 AND parent = ?1 AND state = 'complete'
               )",
        )
        .bind(id)
        .bind(owner_id)
        .execute(self.pool)
        .await
        .map_err(|e| BurrowError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::file::{FileRepository, FileState, FileUpdate, NewFile};
    use crate::Database;

    async fn setup_db() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("owner"))
            .await
            .unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn test_create_folder() {
        let (db, owner) = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(&NewFolder::new(owner, "Documents")).await.unwrap();

        assert_eq!(folder.name, "Documents");
        assert!(folder.is_top_level());
        assert_eq!(folder.owner_id, owner);
        assert_eq!(folder.id.len(), 36);
    }

    #[tokio::test]
    async fn test_get_is_owner_scoped() {
        let (db, owner) = setup_db().await;
        let repo = FolderRepository::new(db.pool());
        let folder = repo.create(&NewFolder::new(owner, "mine")).await.unwrap();

        assert!(repo.get(&folder.id, owner).await.unwrap().is_some());
        assert!(repo.get(&folder.id, owner + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_parent_and_count() {
        let (db, owner) = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let parent = repo.create(&NewFolder::new(owner, "parent")).await.unwrap();
        repo.create(&NewFolder::new(owner, "b").with_parent(&parent.id))
            .await
            .unwrap();
        repo.create(&NewFolder::new(owner, "a").with_parent(&parent.id))
            .await
            .unwrap();

        let names: Vec<String> = repo
            .list_by_parent(owner, &parent.id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        assert_eq!(repo.count(owner).await.unwrap(), 3);
        assert_eq!(repo.list_by_parent(owner, "").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_if_empty_blocks_on_child_folder() {
        let (db, owner) = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let parent = repo.create(&NewFolder::new(owner, "parent")).await.unwrap();
        let child = repo
            .create(&NewFolder::new(owner, "child").with_parent(&parent.id))
            .await
            .unwrap();

        assert!(!repo.delete_if_empty(&parent.id, owner).await.unwrap());
        assert!(repo.delete_if_empty(&child.id, owner).await.unwrap());
        assert!(repo.delete_if_empty(&parent.id, owner).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_with_missing_parent() {
        let (db, owner) = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let result = repo
            .create(&NewFolder::new(owner, "orphan").with_parent("gone"))
            .await;
        assert!(matches!(result, Err(BurrowError::ParentNotFound(p)) if p == "gone"));
        assert_eq!(repo.count(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_under_other_owners_folder() {
        let (db, owner) = setup_db().await;
        let repo = FolderRepository::new(db.pool());
        let theirs = repo.create(&NewFolder::new(owner, "theirs")).await.unwrap();

        let result = repo
            .create(&NewFolder::new(owner + 1, "sneaky").with_parent(&theirs.id))
            .await;
        assert!(matches!(result, Err(BurrowError::ParentNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_if_empty_blocks_on_complete_file() {
        let (db, owner) = setup_db().await;
        let repo = FolderRepository::new(db.pool());
        let files = FileRepository::new(db.pool());

        let folder = repo.create(&NewFolder::new(owner, "f")).await.unwrap();
        let stub = files
            .create(&NewFile::new(owner, "upload.bin").with_parent(&folder.id))
            .await
            .unwrap();
        files
            .update(
                &stub.id,
                owner,
                &FileUpdate::new().state(FileState::Complete),
            )
            .await
            .unwrap()
            .unwrap();

        assert!(!repo.delete_if_empty(&folder.id, owner).await.unwrap());

        files.delete(&stub.id, owner).await.unwrap();
        assert!(repo.delete_if_empty(&folder.id, owner).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_if_empty_ignores_pending_stub() {
        let (db, owner) = setup_db().await;
        let repo = FolderRepository::new(db.pool());
        let files = FileRepository::new(db.pool());

        let folder = repo.create(&NewFolder::new(owner, "f")).await.unwrap();
        files
            .create(&NewFile::new(owner, "abandoned.bin").with_parent(&folder.id))
            .await
            .unwrap();

        assert!(files.list_by_parent(owner, &folder.id).await.unwrap().is_empty());
        assert!(repo.delete_if_empty(&folder.id, owner).await.unwrap());
    }
}
