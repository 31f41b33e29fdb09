//! Request-authenticated, router-composed API gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Gateway                              │
//! │                                                                 │
//! │  ┌──────────────────┐  ┌───────────────────┐  ┌─────────────┐   │
//! │  │  RouterRegistry  │  │ SessionTokenIssuer│  │  Handlers   │   │
//! │  │ (ordered groups) │  │ (bearer tokens)   │  │ (own task)  │   │
//! │  └──────────────────┘  └───────────────────┘  └─────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry and token issuer are read-only once the gateway is built, so
//! a single `Arc<Gateway>` serves every connection without locking.

mod context;
mod dispatcher;
mod handler;
mod registry;
mod response;

pub use context::{PathParams, RequestContext, Subject};
pub use dispatcher::{bearer_token, Gateway, GatewayConfig, DEFAULT_MAX_BODY_BYTES};
pub use handler::{handler_fn, FnHandler, Handler, HandlerResponse};
pub use registry::{Access, PathPattern, ResolvedRoute, Route, RouteGroup, RouterRegistry};
pub use response::{ErrorResponse, UNAUTHORIZED_MESSAGE};
