//! Test Helper Utilities
//!
//! Shared setup for the creatorhub-server integration tests: an in-memory
//! database, a temporary storage root, a recording mailer and seeded users.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use creatorhub_common::config::{CliOverrides, ServerConfig, TomlConfig};
use creatorhub_common::credentials::{generate_token, hash_token};
use creatorhub_common::db::init_memory_database;
use creatorhub_common::{time, AccessLevel, Role};
use creatorhub_server::email::{LogMailer, MailError, Mailer, OutboundEmail};
use creatorhub_server::storage::Storage;
use creatorhub_server::{build_router, db, AppState};

pub const BASE_URL: &str = "http://hub.test";

/// Fails until switched on
#[derive(Default)]
pub struct FlakyMailer {
    pub healthy: AtomicBool,
}

#[async_trait]
impl Mailer for FlakyMailer {
    async fn send(&self, _email: &OutboundEmail) -> Result<String, MailError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok("flaky-ok".to_string())
        } else {
            Err(MailError::Transport("connection refused".to_string()))
        }
    }

    fn provider(&self) -> &'static str {
        "flaky"
    }
}

pub struct TestApp {
    pub state: AppState,
    /// Present unless a custom mailer was supplied
    pub mailer: Option<Arc<LogMailer>>,
    _storage: TempDir,
}

fn test_config(allow_test_data: bool) -> ServerConfig {
    let toml = TomlConfig {
        public_base_url: Some(BASE_URL.to_string()),
        allow_test_data: Some(allow_test_data),
        ..Default::default()
    };
    ServerConfig::from_sources(&CliOverrides::default(), &toml, |_| None)
}

impl TestApp {
    pub async fn new() -> Self {
        let mailer = Arc::new(LogMailer::new());
        let mut app = Self::build(false, mailer.clone()).await;
        app.mailer = Some(mailer);
        app
    }

    pub async fn with_test_data_enabled() -> Self {
        let mailer = Arc::new(LogMailer::new());
        let mut app = Self::build(true, mailer.clone()).await;
        app.mailer = Some(mailer);
        app
    }

    pub async fn with_mailer(mailer: Arc<dyn Mailer>) -> Self {
        Self::build(false, mailer).await
    }

    async fn build(allow_test_data: bool, mailer: Arc<dyn Mailer>) -> Self {
        let db = init_memory_database()
            .await
            .expect("Should create in-memory database");
        let storage_dir = TempDir::new().expect("Should create temp dir");
        let storage = Storage::new(storage_dir.path());
        let state = AppState::new(db, test_config(allow_test_data), mailer, storage);
        Self {
            state,
            mailer: None,
            _storage: storage_dir,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Insert a profile with `roles` and an open session; returns (id, token)
    ///
    /// Sessions are written directly so tests skip password hashing.
    pub async fn user(&self, email: &str, name: &str, roles: &[Role]) -> (String, String) {
        let id = db::profiles::insert_profile(&self.state.db, email, name, false)
            .await
            .expect("Should insert profile");
        for role in roles {
            db::profiles::grant_role(&self.state.db, &id, *role, None)
                .await
                .expect("Should grant role");
        }
        let token = generate_token();
        db::sessions::create_session(
            &self.state.db,
            &hash_token(&token),
            &id,
            time::now() + Duration::hours(1),
        )
        .await
        .expect("Should create session");
        (id, token)
    }

    /// Creator with the given access level
    pub async fn creator(&self, email: &str, name: &str, level: AccessLevel) -> (String, String) {
        let (id, token) = self.user(email, name, &[Role::Creator]).await;
        db::access::upsert_level(&self.state.db, &id, level, None)
            .await
            .expect("Should set access level");
        (id, token)
    }

    pub async fn admin(&self) -> (String, String) {
        self.user("admin@hub.test", "Ada Admin", &[Role::Admin]).await
    }

    pub async fn manager(&self) -> (String, String) {
        self.user("manager@hub.test", "Max Manager", &[Role::Manager])
            .await
    }

    pub async fn set_setting(&self, key: &str, value: &str) {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(value)
            .bind(key)
            .execute(&self.state.db)
            .await
            .expect("Should update setting");
    }

    /// JSON request; an empty response body comes back as `Value::Null`
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        (status, extract_json(response.into_body()).await)
    }

    /// Raw-body request; returns the status, content type and body bytes
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> (StatusCode, Option<String>, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Should read body")
            .to_bytes();
        (status, content_type, bytes.to_vec())
    }

    /// Token from the most recent invitation link sent to `to`
    pub fn invitation_token(&self, to: &str) -> Option<String> {
        let mailer = self.mailer.as_ref()?;
        mailer
            .sent()
            .iter()
            .rev()
            .filter(|email| email.to == to)
            .find_map(|email| {
                let start = email.text.find("token=")? + "token=".len();
                let token: String = email.text[start..]
                    .chars()
                    .take_while(|c| c.is_ascii_hexdigit())
                    .collect();
                (!token.is_empty()).then_some(token)
            })
    }
}

/// Extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
