//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_folder, delete_file, delete_folder, download_file, get_usage, list_files,
    list_folder, list_root_folder, rename_file, upload_file, AppState,
};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};

/// Multipart framing allowance on top of the maximum file size.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    let body_limit = app_state.max_file_size.saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let file_routes = Router::new()
        .route(
            "/",
            post(upload_file)
                .layer(DefaultBodyLimit::max(body_limit))
                .get(list_files),
        )
        .route(
            "/:id",
            get(download_file).patch(rename_file).delete(delete_file),
        );

    let folder_routes = Router::new()
        .route("/", post(create_folder).get(list_root_folder))
        .route("/:id", get(list_folder).delete(delete_folder));

    let api_routes = Router::new()
        .nest("/files", file_routes)
        .nest("/folders", folder_routes)
        .route("/usage", get(get_usage));

    // Clone jwt_state for the middleware closure
    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
