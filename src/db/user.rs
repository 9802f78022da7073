//! User model for Burrow.
//!
//! Users are created by the external authentication service; Burrow only
//! keeps the quota accounting columns up to date.

/// User entity with quota accounting.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (the `sub` claim of bearer tokens).
    pub id: i64,
    /// Login username (unique).
    pub username: String,
    /// Storage quota in bytes (0 = unlimited).
    pub quota: i64,
    /// Bytes currently accounted to this user.
    pub space_used: i64,
    /// Account creation timestamp (RFC 3339).
    pub created_at: String,
}

impl User {
    /// Quota state of this user.
    pub fn usage(&self) -> UserUsage {
        UserUsage {
            quota: self.quota,
            space_used: self.space_used,
        }
    }
}

/// Quota and current usage of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserUsage {
    /// Storage quota in bytes (0 = unlimited).
    pub quota: i64,
    /// Bytes currently accounted.
    pub space_used: i64,
}

impl UserUsage {
    /// Whether an upload must be refused before reading any bytes.
    pub fn is_exhausted(&self) -> bool {
        self.quota != 0 && self.space_used >= self.quota
    }

    /// Bytes left before the quota is reached, or `None` when unlimited.
    pub fn remaining(&self) -> Option<u64> {
        if self.quota == 0 {
            return None;
        }
        Some(self.quota.saturating_sub(self.space_used).max(0) as u64)
    }

    /// Byte ceiling for a single upload given the global file size limit.
    pub fn upload_ceiling(&self, max_file_size: u64) -> u64 {
        match self.remaining() {
            Some(remaining) => remaining.min(max_file_size),
            None => max_file_size,
        }
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login username.
    pub username: String,
    /// Storage quota in bytes (0 = unlimited).
    pub quota: i64,
}

impl NewUser {
    /// Create a new user without a quota.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            quota: 0,
        }
    }

    /// Set the quota in bytes.
    pub fn with_quota(mut self, quota: i64) -> Self {
        self.quota = quota;
        self
    }
}
