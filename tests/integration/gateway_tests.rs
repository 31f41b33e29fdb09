//! Dispatcher integration tests.
//!
//! Tests verify:
//! - Authenticated routes see the token's subject
//! - Missing, expired and tampered tokens are rejected uniformly
//! - Unmatched paths and methods return 404
//! - Registration order breaks ties between groups
//! - Handler panics and failures are contained to their own request
//! - Malformed paths and oversized bodies are rejected with 400

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};

use aiida_gateway::error::HandlerError;
use aiida_gateway::{handler_fn, Access, GatewayConfig, HandlerResponse, RequestContext, RouteGroup, RouterRegistry};

use super::test_utils::{
    body_bytes, body_json, error_body, get, get_with_token, issuer, router_for,
    router_with_config, send,
};

/// `/users` group with a single protected route echoing the caller.
fn whoami_registry() -> RouterRegistry {
    let whoami = handler_fn(|ctx: RequestContext| async move {
        let subject = ctx.subject()?;
        HandlerResponse::ok(&serde_json::json!({ "subject": subject.identifier }))
    });

    RouterRegistry::new()
        .with_group(RouteGroup::new("users", "/users").get("/me", Access::Authenticated, whoami))
        .unwrap()
}

// =============================================================================
// Authenticated Dispatch
// =============================================================================

#[tokio::test]
async fn test_valid_token_reaches_protected_handler() {
    let tokens = issuer(Duration::from_secs(1800));
    let router = router_for(whoami_registry(), tokens.clone());
    let token = tokens.issue("alice").unwrap().token;

    let response = send(&router, get_with_token("/users/me", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["subject"], "alice");
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let router = router_for(whoami_registry(), issuer(Duration::from_secs(1800)));

    let response = send(&router, get("/users/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );

    let error = error_body(response).await;
    assert_eq!(error.error, "unauthorized");
    assert_eq!(error.status, Some(401));
}

#[tokio::test]
async fn test_expired_token_is_indistinguishable_from_missing() {
    let tokens = issuer(Duration::from_secs(1));
    let router = router_for(whoami_registry(), tokens.clone());
    let token = tokens.issue("alice").unwrap().token;

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let expired = send(&router, get_with_token("/users/me", &token)).await;
    let missing = send(&router, get("/users/me")).await;

    assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_bytes(expired).await, body_bytes(missing).await);
}

#[tokio::test]
async fn test_tampered_and_foreign_tokens_are_rejected() {
    let tokens = issuer(Duration::from_secs(1800));
    let router = router_for(whoami_registry(), tokens.clone());
    let token = tokens.issue("alice").unwrap().token;

    // Flip the first payload character
    let mut tampered: Vec<char> = token.chars().collect();
    tampered[0] = if tampered[0] == '7' { '6' } else { '7' };
    let tampered: String = tampered.into_iter().collect();

    let foreign = aiida_gateway::SessionTokenIssuer::new(
        "some-other-secret-that-is-also-long-enough",
        Duration::from_secs(1800),
    )
    .unwrap()
    .issue("alice")
    .unwrap()
    .token;

    let reference = body_bytes(send(&router, get("/users/me")).await).await;

    for bad in [tampered.as_str(), foreign.as_str(), "not-a-token", "a.b.c"] {
        let response = send(&router, get_with_token("/users/me", bad)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "token {:?}", bad);
        assert_eq!(body_bytes(response).await, reference);
    }
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let tokens = issuer(Duration::from_secs(1800));
    let router = router_for(whoami_registry(), tokens.clone());
    let token = tokens.issue("alice").unwrap().token;

    let request = Request::builder()
        .uri("/users/me")
        .header(header::AUTHORIZATION, format!("Basic {}", token))
        .body(Body::empty())
        .unwrap();

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Resolution
// =============================================================================

#[tokio::test]
async fn test_unmatched_path_returns_404() {
    let router = router_for(whoami_registry(), issuer(Duration::from_secs(1800)));

    for uri in ["/nope", "/users/someone/else", "/userstuff/me"] {
        let response = send(&router, get(uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {}", uri);
        assert_eq!(error_body(response).await.error, "not_found");
    }
}

#[tokio::test]
async fn test_method_mismatch_returns_404() {
    let router = router_for(whoami_registry(), issuer(Duration::from_secs(1800)));

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/users/me")
        .body(Body::empty())
        .unwrap();

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_earlier_group_wins_on_overlap() {
    let a = handler_fn(|_ctx| async { HandlerResponse::ok(&"A") });
    let b = handler_fn(|_ctx| async { HandlerResponse::ok(&"B") });

    let registry = RouterRegistry::new()
        .with_group(RouteGroup::new("a", "/api").get("/x", Access::Public, a))
        .unwrap()
        .with_group(RouteGroup::new("b", "/api").get("/x", Access::Public, b))
        .unwrap();
    let router = router_for(registry, issuer(Duration::from_secs(1800)));

    for _ in 0..3 {
        let response = send(&router, get("/api/x")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!("A"));
    }
}

#[tokio::test]
async fn test_later_group_reached_when_earlier_has_no_route() {
    let a = handler_fn(|_ctx| async { HandlerResponse::ok(&"A") });
    let b = handler_fn(|_ctx| async { HandlerResponse::ok(&"B") });

    let registry = RouterRegistry::new()
        .with_group(RouteGroup::new("a", "/api").get("/x", Access::Public, a))
        .unwrap()
        .with_group(RouteGroup::new("b", "/api").get("/y", Access::Public, b))
        .unwrap();
    let router = router_for(registry, issuer(Duration::from_secs(1800)));

    let response = send(&router, get("/api/y")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!("B"));
}

#[tokio::test]
async fn test_path_params_and_query_reach_handler() {
    let echo = handler_fn(|ctx: RequestContext| async move {
        HandlerResponse::ok(&serde_json::json!({
            "name": ctx.param("name"),
            "page": ctx.query_param("page"),
        }))
    });
    let registry = RouterRegistry::new()
        .with_group(RouteGroup::new("nodes", "/nodes").get("/{name}", Access::Public, echo))
        .unwrap();
    let router = router_for(registry, issuer(Duration::from_secs(1800)));

    let response = send(&router, get("/nodes/calc%20job?page=2")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["name"], "calc job");
    assert_eq!(body["page"], "2");
}

// =============================================================================
// Fault Containment
// =============================================================================

#[tokio::test]
async fn test_handler_panic_and_failure_are_contained() {
    let panics = handler_fn(|_ctx: RequestContext| async move {
        if true {
            panic!("handler blew up");
        }
        HandlerResponse::ok(&"unreachable")
    });
    let fails = handler_fn(|_ctx| async {
        Err::<HandlerResponse, _>(HandlerError::Internal(
            "database password is hunter2".to_string(),
        ))
    });
    let healthy = handler_fn(|_ctx| async { HandlerResponse::ok(&"fine") });

    let registry = RouterRegistry::new()
        .with_group(
            RouteGroup::new("faults", "/faults")
                .get("/panic", Access::Public, panics)
                .get("/fail", Access::Public, fails)
                .get("/ok", Access::Public, healthy),
        )
        .unwrap();
    let router = router_for(registry, issuer(Duration::from_secs(1800)));

    let response = send(&router, get("/faults/panic")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let panic_error = error_body(response).await;
    assert_eq!(panic_error.error, "internal_error");
    assert!(!panic_error.message.contains("blew up"));

    let response = send(&router, get("/faults/fail")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let fail_error = error_body(response).await;
    assert!(!fail_error.message.contains("hunter2"));

    let response = send(&router, get("/faults/ok")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!("fine"));
}

// =============================================================================
// Malformed Requests
// =============================================================================

#[tokio::test]
async fn test_malformed_paths_return_400() {
    let router = router_for(whoami_registry(), issuer(Duration::from_secs(1800)));

    for uri in ["/users/../users/me", "/users/%2e%2e/me", "/users/%zz", "/users/%FF"] {
        let response = send(&router, get(uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {}", uri);
        assert_eq!(error_body(response).await.error, "bad_request");
    }
}

#[tokio::test]
async fn test_oversized_body_returns_400() {
    let echo = handler_fn(|ctx: RequestContext| async move {
        HandlerResponse::ok(&serde_json::json!({ "len": ctx.body.len() }))
    });
    let registry = RouterRegistry::new()
        .with_group(RouteGroup::new("echo", "/echo").post("", Access::Public, echo))
        .unwrap();
    let router = router_with_config(
        registry,
        issuer(Duration::from_secs(1800)),
        GatewayConfig::default().with_max_body_bytes(16),
    );

    let small = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .body(Body::from("tiny"))
        .unwrap();
    let response = send(&router, small).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["len"], 4);

    let large = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .body(Body::from(vec![b'x'; 64]))
        .unwrap();
    let response = send(&router, large).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_is_outside_registry() {
    let router = router_for(RouterRegistry::new(), issuer(Duration::from_secs(1800)));

    let response = send(&router, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}
