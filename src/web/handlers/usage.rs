//! Usage handler.

use std::sync::Arc;

use axum::{extract::State, Json};

use super::AppState;
use crate::file::FileService;
use crate::web::dto::{ApiResponse, UsageResponse};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// GET /api/usage - Quota and space used of the caller.
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<UsageResponse>>, ApiError> {
    let usage = FileService::new(state.db.pool(), &state.blobs)
        .usage(user.id())
        .await?;

    Ok(Json(ApiResponse::new(UsageResponse::from(usage))))
}
