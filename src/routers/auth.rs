//! The `auth` route group: login and token introspection.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{CredentialStore, SessionTokenIssuer};
use crate::error::{AuthError, HandlerError};
use crate::gateway::{Access, Handler, HandlerResponse, RequestContext, RouteGroup};

use super::RouterState;

/// Credentials posted to `/auth/token`, as JSON or as an OAuth2
/// password-flow form (`grant_type`, `scope` etc. are ignored).
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Always `"bearer"`
    pub token_type: String,

    /// Lifetime in seconds
    pub expires_in: u64,

    /// Expiry as Unix epoch milliseconds
    pub expires_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub subject: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

/// `POST /auth/token`
pub struct LoginHandler {
    credentials: Arc<CredentialStore>,
    tokens: SessionTokenIssuer,
}

#[async_trait]
impl Handler for LoginHandler {
    async fn call(&self, ctx: RequestContext) -> Result<HandlerResponse, HandlerError> {
        let login: LoginRequest = ctx.form_or_json()?;
        if login.username.is_empty() {
            return Err(HandlerError::BadRequest(
                "username must not be empty".to_string(),
            ));
        }

        if !self
            .credentials
            .verify(&login.username, &login.password)
            .await?
        {
            return Err(HandlerError::Unauthorized(AuthError::BadCredentials));
        }

        let issued = self
            .tokens
            .issue(&login.username)
            .map_err(|e| HandlerError::Internal(e.to_string()))?;

        info!(subject = %login.username, expires_at = issued.expires_at(), "Issued access token");

        HandlerResponse::ok(&TokenResponse {
            access_token: issued.token,
            token_type: "bearer".to_string(),
            expires_in: self.tokens.ttl().as_secs(),
            expires_at: issued.claims.exp,
        })
    }
}

/// `GET /auth/me`
pub struct MeHandler;

#[async_trait]
impl Handler for MeHandler {
    async fn call(&self, ctx: RequestContext) -> Result<HandlerResponse, HandlerError> {
        let subject = ctx.subject()?;
        HandlerResponse::ok(&MeResponse {
            subject: subject.identifier.clone(),
            issued_at: subject.issued_at,
            expires_at: subject.expires_at,
        })
    }
}

pub fn group(state: &RouterState) -> RouteGroup {
    RouteGroup::new("auth", "/auth")
        .post(
            "/token",
            Access::Public,
            Arc::new(LoginHandler {
                credentials: Arc::clone(&state.credentials),
                tokens: state.tokens.clone(),
            }),
        )
        .get("/me", Access::Authenticated, Arc::new(MeHandler))
}
