//! Burrow - per-user file storage service
//!
//! Streams multipart uploads into a blob store under a per-user quota,
//! keeps file metadata and a folder tree in SQLite, and serves it all
//! over an authenticated REST API.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository, UserUsage};
pub use error::{BurrowError, Result};
pub use file::{BlobStore, FileService, FolderResolver, UploadPipeline, ROOT_FOLDER_ID};
