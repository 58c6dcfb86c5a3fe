//! Request DTOs for Web API.

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed, no_path_separators};

/// Folder creation request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(
        length(max = 255, message = "Name must be at most 255 characters"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars"),
        custom(function = "no_path_separators")
    )]
    pub name: String,
    /// Parent folder (omit for the root).
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Rename request.
///
/// For files `new_name` is the stem; the original extension is kept.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameRequest {
    /// New name.
    #[validate(
        length(max = 255, message = "Name must be at most 255 characters"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars"),
        custom(function = "no_path_separators")
    )]
    pub new_name: String,
}

/// Query parameters for listing a folder.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Folder to list (omit for the root).
    #[serde(default)]
    pub parent_id: Option<i64>,
}
