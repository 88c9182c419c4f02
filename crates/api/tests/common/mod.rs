#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use parley_api::auth::jwt::JwtConfig;
use parley_api::config::{LlmConfig, MeteringConfig, ServerConfig};
use parley_api::router::build_app_router;
use parley_api::state::AppState;
use parley_core::roles::{ROLE_ADMIN, ROLE_USER};
use parley_core::types::DbId;
use parley_db::models::project::{NewProject, Project};
use parley_db::repositories::{NotificationRepo, ProjectRepo};
use parley_events::{EventBus, NotificationLogger};
use parley_llm::{Completion, LlmClient, LlmError};
use sqlx::PgPool;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-for-parley-api".to_string(),
            issuer: None,
            leeway_secs: 60,
        },
        metering: MeteringConfig::default(),
        llm: LlmConfig {
            api_key: "sk-test".to_string(),
            base_url: "http://localhost:9".to_string(),
            default_model: "gpt-4o".to_string(),
            timeout: Duration::from_secs(5),
            max_tokens: 500,
            temperature: 0.7,
        },
        notification_webhook_url: None,
    }
}

// ---------------------------------------------------------------------------
// Scripted model client
// ---------------------------------------------------------------------------

/// In-memory [`LlmClient`] that returns a fixed result and counts calls.
pub struct ScriptedLlm {
    result: Result<Completion, LlmError>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    /// Always answers, reporting `tokens` of usage.
    pub fn answering(tokens: i64) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(Completion {
                text: "We are open from 9 to 5.".to_string(),
                tokens_used: tokens,
                model: "gpt-4o".to_string(),
            }),
            calls: AtomicUsize::new(0),
        })
    }

    /// Always fails with `error`.
    pub fn failing(error: LlmError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        _prompt: &str,
        _context: &str,
        _model: &str,
    ) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

/// Build the full application router with a model client that answers with
/// 100 tokens.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_llm(pool, ScriptedLlm::answering(100))
}

/// Build the full application router around `llm`, with the notification
/// logger consuming the event bus as in production.
pub fn build_test_app_with_llm(pool: PgPool, llm: Arc<ScriptedLlm>) -> Router {
    build_test_app_with_config(pool, test_config(), llm)
}

/// Build the application around a caller-adjusted config.
pub fn build_test_app_with_config(
    pool: PgPool,
    config: ServerConfig,
    llm: Arc<ScriptedLlm>,
) -> Router {
    let notifier = NotificationLogger::new(pool.clone(), config.metering.notify_timeout);
    let event_bus = Arc::new(EventBus::default());
    tokio::spawn(notifier.clone().run(event_bus.subscribe()));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus,
        notifier,
        llm,
    };

    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Sign arbitrary claims with the test secret, as the identity service would.
pub fn signed_token(claims: serde_json::Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(test_config().jwt.secret.as_bytes()),
    )
    .expect("token signing")
}

pub fn operator_token(operator: &str, role: &str) -> String {
    signed_token(serde_json::json!({
        "sub": operator,
        "role": role,
        "exp": Utc::now().timestamp() + 15 * 60,
    }))
}

pub fn admin_token() -> String {
    operator_token("ops@parley.dev", ROLE_ADMIN)
}

pub fn user_token() -> String {
    operator_token("support@parley.dev", ROLE_USER)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a project expiring `expiry_days` from now (negative for the past)
/// with the given limit and usage.
pub async fn seed_project(
    pool: &PgPool,
    external_id: &str,
    expiry_days: i64,
    limit: i64,
    used: i64,
) -> Project {
    let now = Utc::now();
    let input = NewProject {
        external_id: external_id.to_string(),
        name: format!("Project {external_id}"),
        description: None,
        client_email: None,
        model: "gpt-4o".to_string(),
        document_text: "Opening hours: 9 to 5.".to_string(),
        start_date: now - chrono::Duration::days(10),
        expiry_date: now + chrono::Duration::days(expiry_days),
        monthly_token_limit: limit,
    };
    let project = ProjectRepo::create(pool, &input)
        .await
        .expect("project creation should succeed");
    if used > 0 {
        ProjectRepo::increment_usage(pool, project.id, used)
            .await
            .expect("usage seed should succeed");
    }
    reload(pool, external_id).await
}

pub async fn reload(pool: &PgPool, external_id: &str) -> Project {
    ProjectRepo::find_by_external_id(pool, external_id)
        .await
        .expect("lookup should succeed")
        .expect("project should exist")
}

/// Poll until `count` notifications of `kind` exist for the project, or
/// give up after two seconds. Returns the final count.
pub async fn wait_for_notifications(pool: &PgPool, project_id: DbId, kind: &str, count: i64) -> i64 {
    let mut seen = 0;
    for _ in 0..40 {
        seen = NotificationRepo::count_by_kind(pool, project_id, kind)
            .await
            .expect("count should succeed");
        if seen >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    seen
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    token: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, None, Some(token)).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(body), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::POST, uri, Some(body), Some(token)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, None, Some(token)).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::PATCH, uri, Some(body), Some(token)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, None, Some(token)).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
