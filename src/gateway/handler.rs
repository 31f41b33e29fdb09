//! Route handler abstraction.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::HandlerError;

use super::context::RequestContext;

/// A successful handler result: a status code and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

impl HandlerResponse {
    pub fn new<T: Serialize>(status: StatusCode, body: &T) -> Result<Self, HandlerError> {
        let body = serde_json::to_value(body)
            .map_err(|e| HandlerError::Internal(format!("failed to serialize response: {}", e)))?;
        Ok(Self { status, body })
    }

    /// 200 OK with `body`.
    pub fn ok<T: Serialize>(body: &T) -> Result<Self, HandlerError> {
        Self::new(StatusCode::OK, body)
    }

    /// 201 Created with `body`.
    pub fn created<T: Serialize>(body: &T) -> Result<Self, HandlerError> {
        Self::new(StatusCode::CREATED, body)
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// A route handler.
///
/// Handlers run concurrently and must not assume exclusive access to shared
/// state. Each invocation consumes its [`RequestContext`].
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, ctx: RequestContext) -> Result<HandlerResponse, HandlerError>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerResponse, HandlerError>> + Send + 'static,
{
    async fn call(&self, ctx: RequestContext) -> Result<HandlerResponse, HandlerError> {
        (self.0)(ctx).await
    }
}

/// Wrap an async closure as a shareable handler.
///
/// ```rust
/// use aiida_gateway::gateway::{handler_fn, HandlerResponse};
///
/// let hello = handler_fn(|_ctx| async { HandlerResponse::ok(&"hello") });
/// # let _ = hello;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerResponse, HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}
