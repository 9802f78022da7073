//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::{no_control_chars, no_path_separators, not_empty_trimmed};

/// Folder creation request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(
        length(min = 1, max = 255, message = "Name must be 1-255 characters"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars"),
        custom(function = "no_path_separators")
    )]
    pub name: String,
    /// Parent folder ID (empty or the ROOT sentinel for the top level).
    #[serde(default)]
    #[validate(length(max = 1024, message = "Parent must be at most 1024 bytes"))]
    pub parent: String,
}

/// File rename request.
#[derive(Debug, Deserialize, Validate)]
pub struct RenameFileRequest {
    /// New display name.
    #[validate(
        length(min = 1, max = 255, message = "Name must be 1-255 characters"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars"),
        custom(function = "no_path_separators")
    )]
    pub name: String,
}
