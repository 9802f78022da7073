//! User repository for Burrow.
//!
//! Besides basic lookups this holds the quota accounting operations used by
//! the upload and delete paths.

use sqlx::SqlitePool;

use super::user::{NewUser, User, UserUsage};
use crate::{BurrowError, Result};

/// Repository for user records and their usage counters.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        if new_user.quota < 0 {
            return Err(BurrowError::Validation(
                "quota must not be negative".to_string(),
            ));
        }

        let result = sqlx::query("INSERT INTO users (username, quota) VALUES (?, ?)")
            .bind(&new_user.username)
            .bind(new_user.quota)
            .execute(self.pool)
            .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| BurrowError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, quota, space_used, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get the quota state of a user.
    pub async fn usage(&self, id: i64) -> Result<Option<UserUsage>> {
        Ok(self.get_by_id(id).await?.map(|u| u.usage()))
    }

    /// Set a user's quota in bytes (0 = unlimited).
    ///
    /// Returns false if the user does not exist.
    pub async fn set_quota(&self, id: i64, quota: i64) -> Result<bool> {
        if quota < 0 {
            return Err(BurrowError::Validation(
                "quota must not be negative".to_string(),
            ));
        }

        let result = sqlx::query("UPDATE users SET quota = ? WHERE id = ?")
            .bind(quota)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Read the raw usage counter of a user.
    pub async fn space_used(&self, id: i64) -> Result<i64> {
        let used: Option<(i64,)> = sqlx::query_as("SELECT space_used FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        used.map(|(v,)| v)
            .ok_or_else(|| BurrowError::NotFound("user".to_string()))
    }

    /// Add `delta` bytes to a user's usage counter, clamping at zero.
    ///
    /// The read-modify-write happens inside one statement, so concurrent
    /// adjustments for the same user do not lose updates.
    pub async fn adjust_space_used(&self, id: i64, delta: i64) -> Result<i64> {
        let updated: Option<(i64,)> = sqlx::query_as(
            "UPDATE users SET space_used = MAX(0, space_used + ?) WHERE id = ?
             RETURNING space_used",
        )
        .bind(delta)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        updated
            .map(|(v,)| v)
            .ok_or_else(|| BurrowError::NotFound("user".to_string()))
    }
}
