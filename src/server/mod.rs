//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │            axum + tower-http (CORS, tracing)                    │
//! │                                                                 │
//! │  ┌─────────────┐  ┌───────────────────────────────────────────┐ │
//! │  │  /health    │  │  fallback ─▶ Gateway::handle              │ │
//! │  └─────────────┘  └───────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{gateway_handler, health_handler, HealthResponse};
pub use routes::{create_router, RouterConfig};
