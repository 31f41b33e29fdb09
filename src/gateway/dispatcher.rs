//! The gateway: turns one inbound request into exactly one response.
//!
//! ```text
//! request ─▶ parse ─▶ resolve ─▶ authenticate? ─▶ read body ─▶ handler task
//!              │         │             │              │             │
//!             400       404           401            400        500 / mapped
//! ```
//!
//! Handlers run in their own task. A panicking handler therefore produces a
//! 500 for its own request and leaves the gateway serving others; if the
//! caller goes away, the task is aborted.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    response::{IntoResponse, Response},
};
use tokio::task::JoinHandle;
use tracing::{debug, error};
use url::form_urlencoded;

use crate::auth::SessionTokenIssuer;
use crate::error::{AuthError, GatewayError};

use super::context::{RequestContext, Subject};
use super::handler::HandlerResponse;
use super::registry::{Access, RouterRegistry};

/// Default cap on request body size (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Immutable dispatcher settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Largest request body accepted; larger bodies are rejected with 400
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl GatewayConfig {
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Top-level request dispatcher.
///
/// Owns the route registry, so routes cannot be registered once requests are
/// being served. Shared across connections behind an `Arc`.
#[derive(Debug)]
pub struct Gateway {
    registry: RouterRegistry,
    tokens: SessionTokenIssuer,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(registry: RouterRegistry, tokens: SessionTokenIssuer, config: GatewayConfig) -> Self {
        Self {
            registry,
            tokens,
            config,
        }
    }

    pub fn registry(&self) -> &RouterRegistry {
        &self.registry
    }

    pub fn tokens(&self) -> &SessionTokenIssuer {
        &self.tokens
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Handle one request. Never fails: every error is mapped to a response.
    pub async fn handle(&self, request: Request) -> Response {
        match self.dispatch(request).await {
            Ok(response) => response.into_response(),
            Err(err) => err.into_response(),
        }
    }

    async fn dispatch(&self, request: Request) -> Result<HandlerResponse, GatewayError> {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path();
        validate_path(path)?;

        let resolved = self
            .registry
            .resolve(&parts.method, path)
            .ok_or_else(|| GatewayError::NoMatch {
                method: parts.method.to_string(),
                path: path.to_string(),
            })?;

        debug!(
            method = %parts.method,
            path,
            group = resolved.group,
            pattern = resolved.route.pattern.as_str(),
            "Resolved route"
        );

        let subject = match resolved.route.access {
            Access::Public => None,
            Access::Authenticated => Some(self.authenticate(&parts.headers)?),
        };

        let body = read_body(body, self.config.max_body_bytes).await?;

        let query = parts
            .uri
            .query()
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        let ctx = RequestContext {
            method: parts.method.clone(),
            path: path.to_string(),
            params: resolved.params,
            query,
            headers: parts.headers.clone(),
            body,
            subject,
        };

        let handler = Arc::clone(&resolved.route.handler);
        let mut task = AbortOnDrop(tokio::spawn(async move { handler.call(ctx).await }));

        match (&mut task.0).await {
            Ok(result) => result.map_err(GatewayError::from),
            Err(join_err) => {
                if join_err.is_panic() {
                    error!(
                        method = %parts.method,
                        path,
                        "Handler panicked"
                    );
                }
                Err(GatewayError::HandlerFault(format!(
                    "handler task failed: {}",
                    join_err
                )))
            }
        }
    }

    /// Validate the bearer token carried in `headers`.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Subject, AuthError> {
        let token = bearer_token(headers)?;
        self.tokens.validate(token).map(Subject::from)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::Missing)?;
    let value = value.to_str().map_err(|_| AuthError::Malformed)?;
    let (scheme, token) = value.trim().split_once(' ').ok_or(AuthError::Malformed)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Malformed);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Malformed);
    }
    Ok(token)
}

/// Reject paths the registry should never see.
fn validate_path(path: &str) -> Result<(), GatewayError> {
    if !path.starts_with('/') {
        return Err(GatewayError::BadRequest("path must be absolute".to_string()));
    }

    for segment in path.split('/') {
        if !is_well_formed_escapes(segment) {
            return Err(GatewayError::BadRequest(
                "path contains invalid percent-encoding".to_string(),
            ));
        }
        let decoded = urlencoding::decode(segment).map_err(|_| {
            GatewayError::BadRequest("path contains invalid percent-encoding".to_string())
        })?;
        if decoded == ".." || decoded == "." {
            return Err(GatewayError::BadRequest(
                "path must not contain dot segments".to_string(),
            ));
        }
    }
    Ok(())
}

/// Every `%` must introduce two hex digits.
fn is_well_formed_escapes(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

async fn read_body(body: Body, limit: usize) -> Result<bytes::Bytes, GatewayError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        debug!(error = %e, limit, "Failed to read request body");
        GatewayError::BadRequest("request body could not be read or is too large".to_string())
    })
}

/// Aborts the wrapped task when dropped, e.g. when the client disconnects.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
