//! Test utilities for integration tests.
//!
//! Builds complete routers over in-memory collaborators, plus a credential
//! source that answers slowly and helpers for driving requests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use aiida_gateway::error::CredentialStoreError;
use aiida_gateway::{
    create_router, default_registry, Credential, CredentialSource, CredentialStore, ErrorResponse,
    Gateway, GatewayConfig, InMemoryCredentialSource, InMemoryStore, RouterConfig,
    RouterRegistry, RouterState, SessionTokenIssuer, User,
};

pub const TEST_SECRET: &str = "integration-test-secret-of-sufficient-length";

/// Lowest bcrypt cost; keeps the suite fast.
pub const TEST_COST: u32 = 4;

pub const ALICE: &str = "alice@example.com";
pub const ALICE_PASSWORD: &str = "wonderland";

// =============================================================================
// Credential Sources
// =============================================================================

pub fn credential(identifier: &str, secret: &str) -> Credential {
    Credential::new(identifier, bcrypt::hash(secret, TEST_COST).unwrap())
}

/// A credential source that waits before answering.
pub struct SlowCredentialSource {
    inner: InMemoryCredentialSource,
    delay: Duration,
}

impl SlowCredentialSource {
    pub fn new(inner: InMemoryCredentialSource, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl CredentialSource for SlowCredentialSource {
    async fn lookup(&self, identifier: &str) -> Result<Option<Credential>, CredentialStoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.lookup(identifier).await
    }
}

// =============================================================================
// App Builders
// =============================================================================

pub fn issuer(ttl: Duration) -> SessionTokenIssuer {
    SessionTokenIssuer::new(TEST_SECRET, ttl).unwrap()
}

pub fn seeded_users() -> Vec<User> {
    vec![
        User {
            id: 1,
            email: ALICE.to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            institution: "Wonderland University".to_string(),
        },
        User {
            id: 2,
            email: "bob@example.com".to_string(),
            first_name: "Bob".to_string(),
            last_name: "Builder".to_string(),
            institution: String::new(),
        },
    ]
}

/// Everything a test needs to drive the full REST API.
pub struct TestApp {
    pub router: Router,
    pub tokens: SessionTokenIssuer,
}

/// Full API with one known credential (alice) and two seeded users.
pub fn full_app() -> TestApp {
    let source = InMemoryCredentialSource::new().with_credential(credential(ALICE, ALICE_PASSWORD));
    build_app(CredentialStore::new(source).with_hash_cost(TEST_COST), issuer(Duration::from_secs(1800)))
}

pub fn build_app(credentials: CredentialStore, tokens: SessionTokenIssuer) -> TestApp {
    let store = Arc::new(InMemoryStore::with_users(seeded_users()).unwrap());
    let state = RouterState::new(credentials, tokens.clone(), store);
    let registry = default_registry(&state).unwrap();
    TestApp {
        router: router_for(registry, tokens.clone()),
        tokens,
    }
}

/// Wrap an arbitrary registry in the HTTP layer.
pub fn router_for(registry: RouterRegistry, tokens: SessionTokenIssuer) -> Router {
    router_with_config(registry, tokens, GatewayConfig::default())
}

pub fn router_with_config(
    registry: RouterRegistry,
    tokens: SessionTokenIssuer,
    config: GatewayConfig,
) -> Router {
    let gateway = Gateway::new(registry, tokens, config);
    create_router(Arc::new(gateway), RouterConfig::new().with_tracing(false))
}

// =============================================================================
// Request Helpers
// =============================================================================

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn error_body(response: Response<Body>) -> ErrorResponse {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Log in through `/auth/token` and return the access token.
pub async fn login(router: &Router, username: &str, password: &str) -> String {
    let response = send(
        router,
        post_json(
            "/auth/token",
            serde_json::json!({ "username": username, "password": password }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["access_token"].as_str().unwrap().to_string()
}
