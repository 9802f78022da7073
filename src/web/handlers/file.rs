//! File handlers: upload, listing, download, rename and delete.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use futures::stream;
use tokio::io::AsyncReadExt;

use super::AppState;
use crate::file::{FileService, UploadPipeline};
use crate::web::dto::{
    ApiResponse, FileResponse, MessageResponse, RenameFileRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// Read buffer size for streaming downloads.
const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Build a safe Content-Disposition header value for file downloads.
///
/// Plain ASCII names go in `filename`; anything else gets an RFC 5987
/// `filename*` alongside a sanitized fallback.
fn content_disposition_header(filename: &str) -> String {
    let unsafe_char = |c: char| c.is_control() || c == '"' || c == '\\';

    if filename.is_ascii() && !filename.chars().any(unsafe_char) {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

/// POST /api/files - Upload one file (multipart `parent`, `file`).
///
/// Answers 201 with an empty body; clients read the new file back through
/// the listings.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<StatusCode, ApiError> {
    let pipeline = UploadPipeline::new(state.db.pool(), &state.blobs, state.max_file_size);
    pipeline.run(user.id(), multipart).await?;

    Ok(StatusCode::CREATED)
}

/// GET /api/files - List all complete files of the caller.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = FileService::new(state.db.pool(), &state.blobs)
        .list_files(user.id())
        .await?;

    Ok(Json(ApiResponse::new(
        files.into_iter().map(FileResponse::from).collect(),
    )))
}

/// GET /api/files/:id - Download a file.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let download = FileService::new(state.db.pool(), &state.blobs)
        .open_download(user.id(), &file_id)
        .await?;
    let record = download.record;

    let body = Body::from_stream(stream::unfold(download.blob, |mut blob| async move {
        let mut buf = vec![0u8; DOWNLOAD_CHUNK_SIZE];
        match blob.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok::<_, std::io::Error>(buf), blob))
            }
            Err(e) => {
                tracing::error!("Failed to read blob: {}", e);
                Some((Err(e), blob))
            }
        }
    }));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &record.mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&record.name),
        )
        .header(header::CONTENT_LENGTH, record.size)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// PATCH /api/files/:id - Rename a file.
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(file_id): Path<String>,
    ValidatedJson(req): ValidatedJson<RenameFileRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let record = FileService::new(state.db.pool(), &state.blobs)
        .rename(user.id(), &file_id, &req.name)
        .await?;

    Ok(Json(ApiResponse::new(FileResponse::from(record))))
}

/// DELETE /api/files/:id - Delete a file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(file_id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    FileService::new(state.db.pool(), &state.blobs)
        .delete(user.id(), &file_id)
        .await?;

    Ok(Json(ApiResponse::new(MessageResponse::new("File deleted"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition_header("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition_header("日本語.txt");
        assert!(value.starts_with("attachment; filename=\"日本語.txt\""));
        assert!(value.contains("filename*=UTF-8''%E6%97%A5%E6%9C%AC%E8%AA%9E.txt"));
    }

    #[test]
    fn test_content_disposition_unsafe_chars() {
        let value = content_disposition_header("a\"b\\c\r\n.txt");
        assert!(value.starts_with("attachment; filename=\"a_b_c.txt\""));
        assert!(value.contains("filename*=UTF-8''a%22b%5Cc%0D%0A.txt"));
    }
}
