// Shared harness for integration tests: an in-memory database, a router
// built exactly like the production one, and request helpers.

use std::path::PathBuf;
use std::str::FromStr;

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use taskhub_server::{
    app::{build_router, AppState},
    config::Config,
    db::Database,
    services::storage::BlobStore,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const MULTIPART_BOUNDARY: &str = "taskhub-test-boundary";

pub struct TestContext {
    pub app: Router,
    pub db: Database,
    pub upload_dir: PathBuf,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        // A single connection keeps every query on the same in-memory db.
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let upload_dir = std::env::temp_dir().join(format!("taskhub-test-{}", Uuid::new_v4()));
        let blobs = BlobStore::new(upload_dir.to_string_lossy().into_owned());
        blobs.init().await.map_err(|e| anyhow::anyhow!("{e}"))?;

        let config = Config {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            upload_dir: upload_dir.to_string_lossy().into_owned(),
            session_secret: "integration-test-secret".to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
        };

        let db = Database { pool };
        let state = AppState {
            db: db.clone(),
            config,
            blobs,
        };

        Ok(Self {
            app: build_router(state),
            db,
            upload_dir,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        role: &str,
    ) -> StatusCode {
        self.request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(serde_json::json!({
                "email": email,
                "username": username,
                "password": password,
                "role": role,
            })),
        )
        .await
        .status()
    }

    /// Logs in and returns the session token. Panics on failure so tests
    /// fail loudly at the setup step.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login failed for {email}");

        let json = body_json(response).await;
        json["token"].as_str().unwrap().to_string()
    }

    pub async fn upload(
        &self,
        token: &str,
        task_id: i64,
        filename: &str,
        contents: &[u8],
    ) -> Response<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; \
                 name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/tasks/{task_id}/upload"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        self.app.clone().oneshot(request).await.unwrap()
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
