#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokenkeep::authority::{AuthoritySettings, now_unix};
use tokenkeep::client::{RefreshReply, SessionApi, TransportError, ValidateReply};
use tokenkeep::{ServerConfig, create_app, db::Database};

pub const SUBJECT: &str = "pro-42";

pub fn test_config(db: &Database) -> ServerConfig {
    ServerConfig {
        db: db.clone(),
        authority: AuthoritySettings {
            token_ttl: Duration::from_secs(3600),
            rotate_on_refresh: false,
        },
        refresh_per_minute: 1000,
        allowed_origin: "*".to_string(),
    }
}

/// Create a test app and return (app, db).
pub async fn create_test_app() -> (axum::Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    (create_app(&test_config(&db)), db)
}

/// Create a test app with a customized config.
pub async fn create_test_app_with(
    configure: impl FnOnce(&mut ServerConfig),
) -> (axum::Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let mut config = test_config(&db);
    configure(&mut config);
    (create_app(&config), db)
}

/// Insert a token expiring `expires_in` seconds from now (negative for the past).
pub async fn insert_token(db: &Database, token: &str, expires_in: i64) {
    let now = now_unix();
    db.tokens()
        .create(token, SUBJECT, now + expires_in, now - 10)
        .await
        .expect("Failed to insert token");
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", bearer(token))
        .body(Body::empty())
        .unwrap()
}

pub fn post_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", bearer(token))
        .body(Body::empty())
        .unwrap()
}

pub fn without_credentials(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Poll `condition` every 10ms until it holds or `timeout_ms` passes.
pub async fn wait_for(condition: impl Fn() -> bool, timeout_ms: u64) -> Result<(), String> {
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    while start.elapsed() < timeout {
        if condition() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    Err(format!("Condition not met within {}ms", timeout_ms))
}

/// In-process `SessionApi` that replays queued replies and counts calls.
///
/// With an empty queue, validate answers `Rejected` and refresh answers
/// `Rejected { status: 401 }`.
#[derive(Default)]
pub struct ScriptedApi {
    validate_replies: Mutex<VecDeque<Result<ValidateReply, TransportError>>>,
    refresh_replies: Mutex<VecDeque<Result<RefreshReply, TransportError>>>,
    validate_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    presented: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply, to hold a composite-policy run open.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn on_validate(self, reply: Result<ValidateReply, TransportError>) -> Self {
        self.validate_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_refresh(self, reply: Result<RefreshReply, TransportError>) -> Self {
        self.refresh_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Every token presented to either endpoint, in order.
    pub fn presented(&self) -> Vec<String> {
        self.presented.lock().unwrap().clone()
    }
}

impl SessionApi for ScriptedApi {
    async fn validate(&self, token: &str) -> Result<ValidateReply, TransportError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.presented.lock().unwrap().push(token.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.validate_replies.lock().unwrap().pop_front();
        reply.unwrap_or(Ok(ValidateReply::Rejected))
    }

    async fn refresh(&self, token: &str) -> Result<RefreshReply, TransportError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.presented.lock().unwrap().push(token.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.refresh_replies.lock().unwrap().pop_front();
        reply.unwrap_or(Ok(RefreshReply::Rejected { status: 401 }))
    }
}
