//! # AiiDA Gateway
//!
//! An authenticated REST API gateway in front of an AiiDA workflow-provenance
//! data store.
//!
//! The gateway composes independently defined route groups into a single HTTP
//! surface, authenticates callers with stateless HMAC-signed bearer tokens,
//! and guarantees exactly one well-formed response per request: handler
//! faults, slow identity lookups and malformed input all map to a status code
//! and a minimal JSON error body.
//!
//! ## Features
//!
//! - **Ordered route registry**: groups are matched in registration order,
//!   routes within a group first-match-wins
//! - **Stateless bearer tokens**: HMAC-SHA256 signed, time-limited, no
//!   server-side session table
//! - **Credential verification**: bcrypt hashes, constant-time comparison,
//!   no user enumeration, bounded lookup time
//! - **Fault isolation**: each handler runs in its own task
//!
//! ## Architecture
//!
//! - [`auth`] - Credential store adapter and session token issuer
//! - [`gateway`] - Route registry, request context and dispatcher
//! - [`routers`] - The `auth` and `users` route groups
//! - [`store`] - Provenance data store collaborator
//! - [`server`] - Axum transport, CORS and tracing
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use aiida_gateway::{
//!     create_router, default_registry, CredentialStore, Gateway, GatewayConfig,
//!     InMemoryCredentialSource, InMemoryStore, RouterConfig, RouterState,
//!     SessionTokenIssuer,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let tokens = SessionTokenIssuer::new(
//!         "a-secret-of-at-least-thirty-two-bytes",
//!         Duration::from_secs(1800),
//!     )
//!     .unwrap();
//!     let state = RouterState::new(
//!         CredentialStore::new(InMemoryCredentialSource::new()),
//!         tokens.clone(),
//!         Arc::new(InMemoryStore::new()),
//!     );
//!     let gateway = Gateway::new(default_registry(&state).unwrap(), tokens, GatewayConfig::default());
//!     let router = create_router(Arc::new(gateway), RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod routers;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use auth::{
    Credential, CredentialSource, CredentialStore, InMemoryCredentialSource, IssuedToken,
    SessionTokenIssuer, TokenClaims,
};
pub use config::{Cli, Command, HashSecretConfig, IssueTokenConfig, ServeConfig, TokenOutputFormat};
pub use error::{
    AuthError, CredentialStoreError, GatewayError, HandlerError, IssuerError, LoadError,
    RegistryError, StoreError,
};
pub use gateway::{
    handler_fn, Access, ErrorResponse, Gateway, GatewayConfig, Handler, HandlerResponse,
    RequestContext, RouteGroup, RouterRegistry, Subject,
};
pub use routers::{default_registry, RouterState};
pub use server::{create_router, health_handler, HealthResponse, RouterConfig};
pub use store::{InMemoryStore, NewUser, ProvenanceStore, User};
