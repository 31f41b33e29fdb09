//! Axum handlers bridging the transport to the gateway.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::gateway::Gateway;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback handler: every other request goes through the gateway.
pub async fn gateway_handler(State(gateway): State<Arc<Gateway>>, request: Request) -> Response {
    gateway.handle(request).await
}
