//! File metadata types and repository for Burrow.
//!
//! Every query is filtered by owner. Records start out `pending` while their
//! blob is being written and only become visible to listing, download and
//! rename once finalized as `complete`.

use std::fmt;

use sqlx::{QueryBuilder, SqlitePool};

use crate::{BurrowError, Result};

const FILE_COLUMNS: &str =
    "id, name, extension, mime_type, size, state, parent, owner_id, created_at";

/// Lifecycle state of a file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Stub created; blob not yet complete.
    Pending,
    /// Blob written and metadata finalized.
    Complete,
}

impl FileState {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Pending => "pending",
            FileState::Complete => "complete",
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for FileState {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(FileState::Pending),
            "complete" => Ok(FileState::Complete),
            other => Err(format!("unknown file state: {other}")),
        }
    }
}

/// Metadata for a stored file.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRecord {
    /// Unique file ID (UUID v4).
    pub id: String,
    /// Display name (basename of the uploaded filename).
    pub name: String,
    /// Lower-cased extension without the dot, empty when absent.
    pub extension: String,
    /// Sniffed MIME type.
    pub mime_type: String,
    /// Size in bytes (authoritative once complete).
    pub size: i64,
    /// Lifecycle state.
    #[sqlx(try_from = "String")]
    pub state: FileState,
    /// Parent folder ID (empty for the top level).
    pub parent: String,
    /// Owning user ID.
    pub owner_id: i64,
    /// When the record was created (RFC 3339).
    pub created_at: String,
}

impl FileRecord {
    /// Whether the upload of this file was finalized.
    pub fn is_complete(&self) -> bool {
        self.state == FileState::Complete
    }
}

/// Data for creating a pending file stub.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// File ID (generated by the caller).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Extension.
    pub extension: String,
    /// MIME type.
    pub mime_type: String,
    /// Parent folder ID (normalized, empty for top level).
    pub parent: String,
    /// Owning user ID.
    pub owner_id: i64,
}

impl NewFile {
    /// Create a new stub with a fresh UUID.
    pub fn new(owner_id: i64, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            extension: String::new(),
            mime_type: super::sniff::OCTET_STREAM.to_string(),
            parent: String::new(),
            owner_id,
        }
    }

    /// Set the extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = parent.into();
        self
    }
}

/// Field mask for updating file metadata. Only set fields are written.
#[derive(Debug, Clone, Default)]
pub struct FileUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New extension.
    pub extension: Option<String>,
    /// New MIME type.
    pub mime_type: Option<String>,
    /// New size.
    pub size: Option<i64>,
    /// New state.
    pub state: Option<FileState>,
    /// New parent folder.
    pub parent: Option<String>,
}

impl FileUpdate {
    /// Create an empty FileUpdate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the extension.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Set the MIME type.
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the size.
    pub fn size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the state.
    pub fn state(mut self, state: FileState) -> Self {
        self.state = Some(state);
        self
    }

    /// Set the parent folder.
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Check if any field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.extension.is_none()
            && self.mime_type.is_none()
            && self.size.is_none()
            && self.state.is_none()
            && self.parent.is_none()
    }
}

/// Repository for file metadata operations.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a pending stub.
    pub async fn create(&self, file: &NewFile) -> Result<FileRecord> {
        sqlx::query(
            "INSERT INTO files (id, name, extension, mime_type, size, state, parent, owner_id)
             VALUES (?, ?, ?, ?, 0, ?, ?, ?)",
        )
        .bind(&file.id)
        .bind(&file.name)
        .bind(&file.extension)
        .bind(&file.mime_type)
        .bind(FileState::Pending.as_str())
        .bind(&file.parent)
        .bind(file.owner_id)
        .execute(self.pool)
        .await
        .map_err(|e| BurrowError::Database(e.to_string()))?;

        self.get(&file.id, file.owner_id)
            .await?
            .ok_or_else(|| BurrowError::NotFound("file".to_string()))
    }

    /// Get a file of the owner regardless of state.
    pub async fn get(&self, id: &str, owner_id: i64) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ? AND owner_id = ?"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| BurrowError::Database(e.to_string()))?;

        Ok(file)
    }

    /// Get a complete file of the owner.
    pub async fn get_complete(&self, id: &str, owner_id: i64) -> Result<Option<FileRecord>> {
        Ok(self.get(id, owner_id).await?.filter(|f| f.is_complete()))
    }

    /// List all complete files of the owner (ordered by name, then id).
    pub async fn list(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE owner_id = ? AND state = 'complete'
             ORDER BY name, id"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| BurrowError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List complete files directly under a folder (normalized parent).
    pub async fn list_by_parent(&self, owner_id: i64, parent: &str) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE owner_id = ? AND parent = ? AND state = 'complete'
             ORDER BY name, id"
        ))
        .bind(owner_id)
        .bind(parent)
        .fetch_all(self.pool)
        .await
        .map_err(|e| BurrowError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List pending stubs of all owners, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE state = 'pending' ORDER BY created_at, id"
        ))
        .fetch_all(self.pool)
        .await
        .map_err(|e| BurrowError::Database(e.to_string()))?;

        Ok(files)
    }

    /// Apply a field mask to a file of the owner.
    ///
    /// When the mask sets a non-empty parent, the row is only written if
    /// that parent is a folder of the owner at the time of the update.
    /// Returns None when no such file exists or the parent check fails.
    pub async fn update(
        &self,
        id: &str,
        owner_id: i64,
        update: &FileUpdate,
    ) -> Result<Option<FileRecord>> {
        if update.is_empty() {
            return self.get(id, owner_id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE files SET ");
        let mut separated = query.separated(", ");

        if let Some(ref name) = update.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }

        if let Some(ref extension) = update.extension {
            separated.push("extension = ");
            separated.push_bind_unseparated(extension);
        }

        if let Some(ref mime_type) = update.mime_type {
            separated.push("mime_type = ");
            separated.push_bind_unseparated(mime_type);
        }

        if let Some(size) = update.size {
            separated.push("size = ");
            separated.push_bind_unseparated(size);
        }

        if let Some(state) = update.state {
            separated.push("state = ");
            separated.push_bind_unseparated(state.as_str());
        }

        if let Some(ref parent) = update.parent {
            separated.push("parent = ");
            separated.push_bind_unseparated(parent);
        }

        query.push(" WHERE id = ");
        query.push_bind(id);
        query.push(" AND owner_id = ");
        query.push_bind(owner_id);

        if let Some(parent) = update.parent.as_deref().filter(|p| !p.is_empty()) {
            query.push(" AND EXISTS (SELECT 1 FROM folders WHERE id = ");
            query.push_bind(parent);
            query.push(" AND owner_id = ");
            query.push_bind(owner_id);
            query.push(")");
        }

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| BurrowError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id, owner_id).await
    }

    /// Delete a file record of the owner.
    pub async fn delete(&self, id: &str, owner_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ? AND owner_id = ?")
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
    use crate::Database;

    async fn setup_db() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("owner"))
            .await
            .unwrap();
        (db, user.id)
    }

    async fn complete(repo: &FileRepository<'_>, file: &FileRecord, size: i64) -> FileRecord {
        repo.update(
            &file.id,
            file.owner_id,
            &FileUpdate::new().size(size).state(FileState::Complete),
        )
        .await
        .unwrap()
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_stub_is_pending() {
        let (db, owner) = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let stub = repo
            .create(
                &NewFile::new(owner, "report.pdf")
                    .with_extension("pdf")
                    .with_mime_type("application/pdf"),
            )
            .await
            .unwrap();

        assert_eq!(stub.name, "report.pdf");
        assert_eq!(stub.extension, "pdf");
        assert_eq!(stub.state, FileState::Pending);
        assert_eq!(stub.size, 0);
        assert_eq!(stub.parent, "");
        assert!(stub.created_at.ends_with('Z'));

        assert!(repo.get(&stub.id, owner).await.unwrap().is_some());
        assert!(repo.get_complete(&stub.id, owner).await.unwrap().is_none());
        assert!(repo.list(owner).await.unwrap().is_empty());
        assert_eq!(repo.list_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_masked_update_only_writes_set_fields() {
        let (db, owner) = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let stub = repo
            .create(&NewFile::new(owner, "a.txt").with_extension("txt"))
            .await
            .unwrap();
        let done = complete(&repo, &stub, 42).await;
        assert_eq!(done.size, 42);
        assert_eq!(done.state, FileState::Complete);
        assert_eq!(done.extension, "txt");

        let renamed = repo
            .update(&stub.id, owner, &FileUpdate::new().name("b.txt"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "b.txt");
        assert_eq!(renamed.size, 42);
        assert_eq!(renamed.extension, "txt");
    }

    #[tokio::test]
    async fn test_update_other_owner_is_none() {
        let (db, owner) = setup_db().await;
        let repo = FileRepository::new(db.pool());
        let stub = repo.create(&NewFile::new(owner, "a")).await.unwrap();

        let result = repo
            .update(&stub.id, owner + 1, &FileUpdate::new().name("x"))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(repo.get(&stub.id, owner + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_parent_requires_existing_folder() {
        let (db, owner) = setup_db().await;
        let repo = FileRepository::new(db.pool());
        let stub = repo.create(&NewFile::new(owner, "a")).await.unwrap();

        let missing = repo
            .update(
                &stub.id,
                owner,
                &FileUpdate::new().parent("gone").state(FileState::Complete),
            )
            .await
            .unwrap();
        assert!(missing.is_none());
        let unchanged = repo.get(&stub.id, owner).await.unwrap().unwrap();
        assert_eq!(unchanged.state, FileState::Pending);
        assert_eq!(unchanged.parent, "");

        let folder = crate::file::FolderRepository::new(db.pool())
            .create(&crate::file::NewFolder::new(owner, "docs"))
            .await
            .unwrap();
        let moved = repo
            .update(&stub.id, owner, &FileUpdate::new().parent(&folder.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.parent, folder.id);

        let top = repo
            .update(&stub.id, owner, &FileUpdate::new().parent(""))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(top.parent, "");
    }

    #[tokio::test]
    async fn test_list_by_parent_orders_by_name() {
        let (db, owner) = setup_db().await;
        let repo = FileRepository::new(db.pool());

        for name in ["zeta", "alpha", "mid"] {
            let stub = repo
                .create(&NewFile::new(owner, name).with_parent("folder-1"))
                .await
                .unwrap();
            complete(&repo, &stub, 1).await;
        }
        repo.create(&NewFile::new(owner, "pending").with_parent("folder-1"))
            .await
            .unwrap();

        let names: Vec<String> = repo
            .list_by_parent(owner, "folder-1")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);

        assert_eq!(repo.list_pending().await.unwrap().len(), 1);
        assert!(repo.list_by_parent(owner, "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let (db, owner) = setup_db().await;
        let repo = FileRepository::new(db.pool());
        let stub = repo.create(&NewFile::new(owner, "a")).await.unwrap();

        assert!(!repo.delete(&stub.id, owner + 1).await.unwrap());
        assert!(repo.delete(&stub.id, owner).await.unwrap());
        assert!(!repo.delete(&stub.id, owner).await.unwrap());
    }

    #[test]
    fn test_file_state_conversion() {
        assert_eq!(
            FileState::try_from("pending".to_string()).unwrap(),
            FileState::Pending
        );
        assert_eq!(
            FileState::try_from("complete".to_string()).unwrap(),
            FileState::Complete
        );
        assert!(FileState::try_from("gone".to_string()).is_err());
        assert_eq!(FileState::Complete.to_string(), "complete");
    }
}
