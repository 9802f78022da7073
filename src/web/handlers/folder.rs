//! Folder handlers: create, list contents and delete.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::AppState;
use crate::file::{FolderResolver, ROOT_FOLDER_ID};
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, FolderContentsResponse, FolderResponse, MessageResponse,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// POST /api/folders - Create a folder.
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    let folder = FolderResolver::new(state.db.pool())
        .create_folder(user.id(), &req.name, &req.parent)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(FolderResponse::from(folder))),
    ))
}

/// GET /api/folders - List the contents of the top level.
pub async fn list_root_folder(
    state: State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<FolderContentsResponse>>, ApiError> {
    list_folder(state, user, Path(ROOT_FOLDER_ID.to_string())).await
}

/// GET /api/folders/:id - List the contents of a folder.
pub async fn list_folder(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(folder_id): Path<String>,
) -> Result<Json<ApiResponse<FolderContentsResponse>>, ApiError> {
    let contents = FolderResolver::new(state.db.pool())
        .list_children(user.id(), &folder_id)
        .await?;

    Ok(Json(ApiResponse::new(FolderContentsResponse::from(
        contents,
    ))))
}

/// DELETE /api/folders/:id - Delete an empty folder.
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(folder_id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    FolderResolver::new(state.db.pool())
        .delete_folder(user.id(), &folder_id)
        .await?;

    Ok(Json(ApiResponse::new(MessageResponse::new("Folder deleted"))))
}
