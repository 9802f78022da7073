//! Test helpers for Web API integration tests.
//!
//! Builds an in-process server over an in-memory database and a temporary
//! blob store, and mints bearer tokens for test users.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestRequest, TestServer};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tempfile::TempDir;

use burrow::db::{NewUser, UserRepository};
use burrow::web::handlers::AppState;
use burrow::web::middleware::{JwtClaims, JwtState};
use burrow::web::router::{create_health_router, create_router};
use burrow::{BlobStore, Database};

/// JWT secret shared by the server and the token helper.
pub const TEST_SECRET: &str = "test-secret-key-for-testing-only";

/// Maximum file size used by test servers unless overridden.
pub const TEST_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// In-process server plus the resources backing it.
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<Database>,
    pub blobs: BlobStore,
    _dir: TempDir,
}

impl TestApp {
    /// Create a test app with the default file size limit.
    pub async fn new() -> Self {
        Self::with_max_file_size(TEST_MAX_FILE_SIZE).await
    }

    /// Create a test app with a custom file size limit.
    pub async fn with_max_file_size(max_file_size: u64) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let db = Arc::new(db);
        let blobs = BlobStore::new(dir.path().join("blobs"))
            .await
            .expect("Failed to create blob store");

        let app_state = Arc::new(AppState::new(db.clone(), blobs.clone(), max_file_size));
        let jwt_state = Arc::new(JwtState::new(TEST_SECRET));

        let router = create_router(app_state, jwt_state, &[]).merge(create_health_router());
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            db,
            blobs,
            _dir: dir,
        }
    }

    /// Create a user with the given quota and return its ID.
    pub async fn create_user(&self, username: &str, quota: i64) -> i64 {
        UserRepository::new(self.db.pool())
            .create(&NewUser::new(username).with_quota(quota))
            .await
            .expect("Failed to create test user")
            .id
    }

    /// Current space used by a user.
    pub async fn space_used(&self, user_id: i64) -> i64 {
        UserRepository::new(self.db.pool())
            .space_used(user_id)
            .await
            .expect("Failed to read space used")
    }

    /// Number of blobs stored for a user.
    pub fn blob_count(&self, user_id: i64) -> usize {
        let dir = self.blobs.root().join(user_id.to_string());
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    /// IDs of the caller's complete files.
    pub async fn file_ids(&self, token: &str) -> Vec<String> {
        let body: Value = self.get("/api/files", token).await.json();
        body["data"]
            .as_array()
            .expect("file list")
            .iter()
            .map(|f| f["id"].as_str().expect("file id").to_string())
            .collect()
    }

    /// Upload a file and return its listing entry.
    ///
    /// The upload itself answers with an empty body, so the new record is
    /// read back from `GET /api/files`.
    pub async fn upload(&self, token: &str, parent: Option<&str>, name: &str, bytes: &[u8]) -> Value {
        let before = self.file_ids(token).await;

        let response = self
            .server
            .post("/api/files")
            .add_header(AUTHORIZATION, bearer(token))
            .multipart(upload_form(parent, name, bytes))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        assert!(response.as_bytes().is_empty());

        let body: Value = self.get("/api/files", token).await.json();
        let mut added: Vec<Value> = body["data"]
            .as_array()
            .expect("file list")
            .iter()
            .filter(|f| !before.iter().any(|id| f["id"] == id.as_str()))
            .cloned()
            .collect();
        assert_eq!(added.len(), 1, "exactly one new file");
        added.remove(0)
    }

    /// Create a folder and return its ID.
    pub async fn create_folder(&self, token: &str, name: &str, parent: &str) -> String {
        let response = self
            .server
            .post("/api/folders")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&serde_json::json!({ "name": name, "parent": parent }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["data"]["id"]
            .as_str()
            .expect("folder id")
            .to_string()
    }

    /// Start an authenticated GET request.
    pub fn get(&self, path: &str, token: &str) -> TestRequest {
        self.server.get(path).add_header(AUTHORIZATION, bearer(token))
    }

    /// Start an authenticated DELETE request.
    pub fn delete(&self, path: &str, token: &str) -> TestRequest {
        self.server
            .delete(path)
            .add_header(AUTHORIZATION, bearer(token))
    }
}

/// Mint a valid token for a user ID.
pub fn token_for(user_id: i64) -> String {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = JwtClaims {
        sub: user_id,
        username: None,
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("Failed to encode token")
}

/// Authorization header value for a token.
pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).expect("valid header")
}

/// Build an upload form with an optional `parent` field before the file.
pub fn upload_form(parent: Option<&str>, name: &str, bytes: &[u8]) -> MultipartForm {
    let mut form = MultipartForm::new();
    if let Some(parent) = parent {
        form = form.add_text("parent", parent.to_string());
    }
    form.add_part("file", Part::bytes(bytes.to_vec()).file_name(name))
}
