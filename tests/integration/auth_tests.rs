//! Login and token introspection tests.
//!
//! Tests verify:
//! - JSON and form-encoded logins issue working tokens
//! - Wrong passwords and unknown identifiers fail identically
//! - A slow credential store yields 503 instead of hanging
//! - `/auth/me` reports the token's claims

use std::time::{Duration, Instant};

use axum::http::StatusCode;

use aiida_gateway::routers::auth::{MeResponse, TokenResponse};
use aiida_gateway::{CredentialStore, InMemoryCredentialSource};

use super::test_utils::{
    body_bytes, body_json, build_app, credential, error_body, full_app, get, get_with_token,
    issuer, login, post_form, post_json, send, SlowCredentialSource, ALICE, ALICE_PASSWORD,
    TEST_COST,
};

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_json_login_issues_valid_token() {
    let app = full_app();

    let response = send(
        &app.router,
        post_json(
            "/auth/token",
            serde_json::json!({ "username": ALICE, "password": ALICE_PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: TokenResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.token_type, "bearer");
    assert_eq!(body.expires_in, 1800);

    let claims = app.tokens.validate(&body.access_token).unwrap();
    assert_eq!(claims.sub, ALICE);
    assert_eq!(claims.exp, body.expires_at);
}

#[tokio::test]
async fn test_form_login_issues_valid_token() {
    let app = full_app();

    let response = send(
        &app.router,
        post_form(
            "/auth/token",
            "grant_type=password&username=alice%40example.com&password=wonderland&scope=",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let token = body["access_token"].as_str().unwrap();
    assert_eq!(app.tokens.validate(token).unwrap().sub, ALICE);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_fail_identically() {
    let app = full_app();

    let wrong_password = send(
        &app.router,
        post_json(
            "/auth/token",
            serde_json::json!({ "username": ALICE, "password": "looking-glass" }),
            None,
        ),
    )
    .await;
    let unknown_user = send(
        &app.router,
        post_json(
            "/auth/token",
            serde_json::json!({ "username": "mallory@example.com", "password": "x" }),
            None,
        ),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_bytes(wrong_password).await, body_bytes(unknown_user).await);
}

#[tokio::test]
async fn test_malformed_login_body_returns_400() {
    let app = full_app();

    let missing_password = send(
        &app.router,
        post_json("/auth/token", serde_json::json!({ "username": ALICE }), None),
    )
    .await;
    assert_eq!(missing_password.status(), StatusCode::BAD_REQUEST);

    let empty_username = send(
        &app.router,
        post_json(
            "/auth/token",
            serde_json::json!({ "username": "", "password": "x" }),
            None,
        ),
    )
    .await;
    assert_eq!(empty_username.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_slow_credential_store_returns_503() {
    let source = SlowCredentialSource::new(
        InMemoryCredentialSource::new().with_credential(credential(ALICE, ALICE_PASSWORD)),
        Duration::from_secs(2),
    );
    let credentials = CredentialStore::new(source)
        .with_timeout(Duration::from_secs(1))
        .with_hash_cost(TEST_COST);
    let app = build_app(credentials, issuer(Duration::from_secs(1800)));

    let started = Instant::now();
    let response = send(
        &app.router,
        post_json(
            "/auth/token",
            serde_json::json!({ "username": ALICE, "password": ALICE_PASSWORD }),
            None,
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(started.elapsed() < Duration::from_millis(1900));
    assert_eq!(error_body(response).await.error, "service_unavailable");
}

#[tokio::test]
async fn test_slow_login_does_not_block_other_requests() {
    let source = SlowCredentialSource::new(
        InMemoryCredentialSource::new().with_credential(credential(ALICE, ALICE_PASSWORD)),
        Duration::from_secs(1),
    );
    let credentials = CredentialStore::new(source)
        .with_timeout(Duration::from_secs(5))
        .with_hash_cost(TEST_COST);
    let app = build_app(credentials, issuer(Duration::from_secs(1800)));
    let token = app.tokens.issue(ALICE).unwrap().token;

    let started = Instant::now();
    let router = app.router.clone();
    let pending_login = tokio::spawn(async move {
        let response = send(
            &router,
            post_json(
                "/auth/token",
                serde_json::json!({ "username": ALICE, "password": ALICE_PASSWORD }),
                None,
            ),
        )
        .await;
        (response.status(), started.elapsed())
    });

    // Let the login reach the credential source first
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = send(&app.router, get("/users")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&app.router, get_with_token("/users/me", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let others_done = started.elapsed();

    assert!(!pending_login.is_finished());

    let (login_status, login_done) = pending_login.await.unwrap();
    assert_eq!(login_status, StatusCode::OK);
    assert!(login_done >= Duration::from_secs(1));
    assert!(others_done < Duration::from_millis(500));
}

// =============================================================================
// Introspection
// =============================================================================

#[tokio::test]
async fn test_me_reports_token_claims() {
    let app = full_app();
    let token = login(&app.router, ALICE, ALICE_PASSWORD).await;
    let claims = app.tokens.validate(&token).unwrap();

    let response = send(&app.router, get_with_token("/auth/me", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let me: MeResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(me.subject, ALICE);
    assert_eq!(me.issued_at, claims.iat);
    assert_eq!(me.expires_at, claims.exp);
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = full_app();

    let response = send(&app.router, get("/auth/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
