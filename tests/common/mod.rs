//! Test helpers for integration tests.
//!
//! Provides a file service over an in-memory database and temporary blob
//! directory, an HTTP test server around it, and token minting.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use tempfile::TempDir;

use filevault::web::handlers::AppState;
use filevault::web::middleware::{JwtClaims, JwtState};
use filevault::web::router::create_app;
use filevault::{Database, FileService, FileStorage};

/// Secret shared by the test server and minted tokens.
pub const TEST_JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// Everything a test needs to drive the file service.
pub struct TestContext {
    pub db: Database,
    pub storage: FileStorage,
    pub service: FileService,
    /// Keeps the blob directory alive for the test's duration.
    pub temp_dir: TempDir,
}

impl TestContext {
    /// Create a context backed by an in-memory database.
    pub async fn new() -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        Self::with_database(db)
    }

    /// Create a context backed by an on-disk database, allowing real
    /// concurrent connections.
    pub async fn on_disk() -> (Self, TempDir) {
        let db_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(db_dir.path().join("filevault.db"))
            .await
            .expect("Failed to open test database");
        (Self::with_database(db), db_dir)
    }

    fn with_database(db: Database) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = FileStorage::new(temp_dir.path()).expect("Failed to create storage");
        let service = FileService::with_database(&db, storage.clone());
        Self {
            db,
            storage,
            service,
            temp_dir,
        }
    }

    /// Number of blobs currently stored for an owner.
    pub fn blob_count(&self, owner_id: i64) -> usize {
        std::fs::read_dir(self.storage.owner_dir(owner_id))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Mint a valid token for `owner_id`.
pub fn token_for(owner_id: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: owner_id,
        iat: now as u64,
        exp: (now + 3600) as u64,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to encode token")
}

/// Authorization header value for `owner_id`.
pub fn bearer(owner_id: i64) -> String {
    format!("Bearer {}", token_for(owner_id))
}

/// Create a test server around a fresh context.
pub async fn create_test_server() -> (TestServer, TestContext) {
    let ctx = TestContext::new().await;
    let server = create_test_server_for(&ctx);
    (server, ctx)
}

/// Create a test server around an existing service.
pub fn create_test_server_for(ctx: &TestContext) -> TestServer {
    let app_state = Arc::new(AppState::new(ctx.service.clone()));
    let jwt_state = Arc::new(JwtState::new(TEST_JWT_SECRET));
    let router = create_app(app_state, jwt_state, &[]);

    TestServer::new(router).expect("Failed to create test server")
}
