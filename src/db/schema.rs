//! Database schema and migrations for Burrow.
//!
//! Migrations are applied in order; the schema_version table records
//! which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users with quota accounting
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    quota       INTEGER NOT NULL DEFAULT 0 CHECK (quota >= 0),  -- bytes, 0 = unlimited
    space_used  INTEGER NOT NULL DEFAULT 0 CHECK (space_used >= 0),
    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);
"#,
    // v2: Folder tree. parent = '' means top level.
    r#"
CREATE TABLE folders (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    parent      TEXT NOT NULL DEFAULT '',
    owner_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX idx_folders_owner_parent ON folders(owner_id, parent);
"#,
    // v3: File metadata. Blobs are stored at <owner_id>/<id>.
    r#"
CREATE TABLE files (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    extension   TEXT NOT NULL DEFAULT '',
    mime_type   TEXT NOT NULL DEFAULT 'application/octet-stream',
    size        INTEGER NOT NULL DEFAULT 0,
    state       TEXT NOT NULL DEFAULT 'pending',  -- 'pending' or 'complete'
    parent      TEXT NOT NULL DEFAULT '',
    owner_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX idx_files_owner_parent ON files(owner_id, parent);
CREATE INDEX idx_files_state ON files(state);
"#,
];
