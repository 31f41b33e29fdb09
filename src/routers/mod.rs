//! Route groups exposed by the REST API.
//!
//! # Route Structure
//!
//! ```text
//! POST /auth/token    - Exchange credentials for a bearer token (public)
//! GET  /auth/me       - Introspect the presented token (protected)
//! GET  /users         - List users (public)
//! GET  /users/me      - Current user's record (protected)
//! GET  /users/{id}    - One user by id (public)
//! POST /users         - Create a user (protected)
//! ```
//!
//! New groups are appended after the existing ones and must use a prefix of
//! their own, so existing paths keep resolving exactly as before.

pub mod auth;
pub mod users;

use std::sync::Arc;

use crate::auth::{CredentialStore, SessionTokenIssuer};
use crate::error::RegistryError;
use crate::gateway::RouterRegistry;
use crate::store::ProvenanceStore;

/// Collaborators shared by the route handlers.
#[derive(Clone)]
pub struct RouterState {
    pub credentials: Arc<CredentialStore>,
    pub tokens: SessionTokenIssuer,
    pub store: Arc<dyn ProvenanceStore>,
}

impl RouterState {
    pub fn new(
        credentials: CredentialStore,
        tokens: SessionTokenIssuer,
        store: Arc<dyn ProvenanceStore>,
    ) -> Self {
        Self {
            credentials: Arc::new(credentials),
            tokens,
            store,
        }
    }
}

/// Build the registry with every route group, in binding order:
/// `auth` first, then `users`.
pub fn default_registry(state: &RouterState) -> Result<RouterRegistry, RegistryError> {
    RouterRegistry::new()
        .with_group(auth::group(state))?
        .with_group(users::group(state))
}
