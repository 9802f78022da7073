//! Web API File Tests
//!
//! Integration tests for listing, downloading, renaming and deleting files,
//! and for the usage endpoint.

mod common;

use axum::http::header::{AUTHORIZATION, ORIGIN};
use axum::http::HeaderValue;
use axum::http::StatusCode;
use serde_json::{json, Value};

use burrow::file::blob_path;
use common::{bearer, token_for, TestApp};

// ============================================================================
// List Tests
// ============================================================================

#[tokio::test]
async fn test_list_files() {
    let app = TestApp::new().await;
    let user_id = app.create_user("alice", 0).await;
    let token = token_for(user_id);

    let folder = app.create_folder(&token, "Docs", "").await;
    app.upload(&token, None, "top.txt", b"top").await;
    app.upload(&token, Some(&folder), "nested.txt", b"nested").await;

    let response = app.get("/api/files", &token).await;
    response.assert_status_ok();

    let body: Value = response.json();
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["nested.txt", "top.txt"]);
}

#[tokio::test]
async fn test_list_files_is_owner_scoped() {
    let app = TestApp::new().await;
    let alice = token_for(app.create_user("alice", 0).await);
    let bob = token_for(app.create_user("bob", 0).await);

    app.upload(&alice, None, "mine.txt", b"secret").await;

    let body: Value = app.get("/api/files", &bob).await.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

// ============================================================================
// Download Tests
// ============================================================================

#[tokio::test]
async fn test_download_file() {
    let app = TestApp::new().await;
    let user_id = app.create_user("alice", 0).await;
    let token = token_for(user_id);

    let file = app.upload(&token, None, "hello.txt", b"hello world").await;
    let file_id = file["id"].as_str().unwrap();

    let response = app.get(&format!("/api/files/{}", file_id), &token).await;
    response.assert_status_ok();

    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        response.header("content-disposition").to_str().unwrap(),
        "attachment; filename=\"hello.txt\""
    );
    assert_eq!(response.header("content-length").to_str().unwrap(), "11");
    assert_eq!(response.header("cache-control").to_str().unwrap(), "no-cache");
    assert_eq!(response.as_bytes().as_ref(), b"hello world");
}

#[tokio::test]
async fn test_download_exposes_content_disposition() {
    let app = TestApp::new().await;
    let user_id = app.create_user("alice", 0).await;
    let token = token_for(user_id);

    let file = app.upload(&token, None, "hello.txt", b"hello").await;
    let file_id = file["id"].as_str().unwrap();

    let response = app
        .get(&format!("/api/files/{}", file_id), &token)
        .add_header(ORIGIN, HeaderValue::from_static("http://localhost:5173"))
        .await;
    response.assert_status_ok();

    let exposed = response.headers().get_all("access-control-expose-headers");
    let exposed: Vec<String> = exposed
        .iter()
        .map(|v| v.to_str().unwrap().to_ascii_lowercase())
        .collect();
    assert_eq!(exposed.len(), 1, "header set once: {exposed:?}");
    assert!(exposed[0].contains("content-disposition"));
}

#[tokio::test]
async fn test_download_large_file_streams_all_bytes() {
    let app = TestApp::new().await;
    let user_id = app.create_user("alice", 0).await;
    let token = token_for(user_id);

    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let file = app.upload(&token, None, "data.bin", &content).await;
    let file_id = file["id"].as_str().unwrap();

    let response = app.get(&format!("/api/files/{}", file_id), &token).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), content.as_slice());
}

#[tokio::test]
async fn test_download_with_query_token() {
    let app = TestApp::new().await;
    let user_id = app.create_user("alice", 0).await;
    let token = token_for(user_id);

    let file = app.upload(&token, None, "a.txt", b"abc").await;
    let file_id = file["id"].as_str().unwrap();

    let response = app
        .server
        .get(&format!("/api/files/{}", file_id))
        .add_query_param("token", &token)
        .await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"abc");
}

#[tokio::test]
async fn test_download_not_found() {
    let app = TestApp::new().await;
    let token = token_for(app.create_user("alice", 0).await);

    app.get("/api/files/does-not-exist", &token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_other_users_file() {
    let app = TestApp::new().await;
    let alice = token_for(app.create_user("alice", 0).await);
    let bob = token_for(app.create_user("bob", 0).await);

    let file = app.upload(&alice, None, "a.txt", b"abc").await;
    let file_id = file["id"].as_str().unwrap();

    app.get(&format!("/api/files/{}", file_id), &bob)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_missing_blob() {
    let app = TestApp::new().await;
    let user_id = app.create_user("alice", 0).await;
    let token = token_for(user_id);

    let file = app.upload(&token, None, "a.txt", b"abc").await;
    let file_id = file["id"].as_str().unwrap();
    app.blobs.remove(&blob_path(user_id, file_id)).await.unwrap();

    app.get(&format!("/api/files/{}", file_id), &token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Rename Tests
// ============================================================================

#[tokio::test]
async fn test_rename_file() {
    let app = TestApp::new().await;
    let user_id = app.create_user("alice", 0).await;
    let token = token_for(user_id);

    let file = app.upload(&token, None, "draft.txt", b"abc").await;
    let file_id = file["id"].as_str().unwrap();

    let response = app
        .server
        .patch(&format!("/api/files/{}", file_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "name": "final.txt" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["name"], "final.txt");
    assert_eq!(body["data"]["extension"], "txt");
    assert_eq!(body["data"]["size"], 3);

    let response = app.get(&format!("/api/files/{}", file_id), &token).await;
    assert_eq!(
        response.header("content-disposition").to_str().unwrap(),
        "attachment; filename=\"final.txt\""
    );
}

#[tokio::test]
async fn test_rename_file_invalid_name() {
    let app = TestApp::new().await;
    let token = token_for(app.create_user("alice", 0).await);

    let file = app.upload(&token, None, "a.txt", b"abc").await;
    let file_id = file["id"].as_str().unwrap();

    let response = app
        .server
        .patch(&format!("/api/files/{}", file_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "name": "../escape" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_rename_file_not_found() {
    let app = TestApp::new().await;
    let token = token_for(app.create_user("alice", 0).await);

    let response = app
        .server
        .patch("/api/files/missing")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "name": "x.txt" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Delete Tests
// ============================================================================

#[tokio::test]
async fn test_delete_file_releases_space() {
    let app = TestApp::new().await;
    let user_id = app.create_user("alice", 1000).await;
    let token = token_for(user_id);

    let file = app.upload(&token, None, "a.bin", &[1u8; 90]).await;
    let file_id = file["id"].as_str().unwrap();
    assert_eq!(app.space_used(user_id).await, 90);

    let response = app.delete(&format!("/api/files/{}", file_id), &token).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["message"], "File deleted");

    assert_eq!(app.space_used(user_id).await, 0);
    assert_eq!(app.blob_count(user_id), 0);

    app.get(&format!("/api/files/{}", file_id), &token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_file_with_missing_blob() {
    let app = TestApp::new().await;
    let user_id = app.create_user("alice", 0).await;
    let token = token_for(user_id);

    let file = app.upload(&token, None, "a.txt", b"abc").await;
    let file_id = file["id"].as_str().unwrap();
    app.blobs.remove(&blob_path(user_id, file_id)).await.unwrap();

    app.delete(&format!("/api/files/{}", file_id), &token)
        .await
        .assert_status_ok();
    assert_eq!(app.space_used(user_id).await, 0);
}

#[tokio::test]
async fn test_delete_file_not_found() {
    let app = TestApp::new().await;
    let token = token_for(app.create_user("alice", 0).await);

    app.delete("/api/files/missing", &token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Usage Tests
// ============================================================================

#[tokio::test]
async fn test_usage() {
    let app = TestApp::new().await;
    let user_id = app.create_user("alice", 1000).await;
    let token = token_for(user_id);

    app.upload(&token, None, "a.bin", &[0u8; 90]).await;

    let response = app.get("/api/usage", &token).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["quota"], 1000);
    assert_eq!(body["data"]["space_used"], 90);
    assert_eq!(body["data"]["remaining"], 910);
}

#[tokio::test]
async fn test_usage_unlimited() {
    let app = TestApp::new().await;
    let token = token_for(app.create_user("alice", 0).await);

    let body: Value = app.get("/api/usage", &token).await.json();
    assert_eq!(body["data"]["quota"], 0);
    assert!(body["data"].get("remaining").is_none());
}

#[tokio::test]
async fn test_invalid_token() {
    let app = TestApp::new().await;

    app.server
        .get("/api/files")
        .add_header(AUTHORIZATION, bearer("not-a-jwt"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");
}
