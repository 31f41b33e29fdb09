use std::path::PathBuf;

use thiserror::Error;

/// Failures reaching the external identity source.
///
/// A missing identity or a wrong secret is never an error here; those collapse
/// into a plain `false` from [`crate::auth::CredentialStore::verify`].
#[derive(Debug, Clone, Error)]
pub enum CredentialStoreError {
    /// Lookup did not complete within the configured budget
    #[error("credential lookup timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Identity source could not be reached or failed internally
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    /// Local fault while verifying, e.g. the hashing task panicked
    #[error("credential verification failed: {0}")]
    Internal(String),
}

/// Authentication failures on protected routes.
///
/// Clients only ever see a single undifferentiated 401 for any of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header on a protected route
    #[error("missing bearer token")]
    Missing,

    /// Header or token is structurally invalid
    #[error("malformed bearer token")]
    Malformed,

    /// Token signature does not match its payload
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token is past its expiry
    #[error("token expired at {expires_at} (current time: {current_time})")]
    Expired { expires_at: u64, current_time: u64 },

    /// Login rejected: unknown identifier or wrong secret
    #[error("invalid credentials")]
    BadCredentials,
}

/// Errors constructing the token issuer or minting a token.
#[derive(Debug, Clone, Error)]
pub enum IssuerError {
    #[error("token secret is too short: need at least {min} bytes, got {actual}")]
    SecretTooShort { min: usize, actual: usize },

    #[error("failed to encode token claims: {0}")]
    Encoding(String),
}

/// Errors raised by the provenance data store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflicting record: {0}")]
    Conflict(String),

    #[error("data store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that occur while building the route registry at startup.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("invalid prefix '{prefix}' for route group '{group}': {reason}")]
    InvalidPrefix {
        group: String,
        prefix: String,
        reason: &'static str,
    },

    #[error("route group '{0}' has no routes")]
    EmptyGroup(String),
}

/// Errors loading startup data (credentials, seed records) from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate entry '{0}'")]
    Duplicate(String),
}

/// Outcomes a route handler can report back to the dispatcher.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized(AuthError),

    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Unexpected failure; detail is logged, never sent to the client
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => HandlerError::NotFound(what),
            StoreError::Conflict(what) => HandlerError::Conflict(what),
            StoreError::Unavailable(reason) => HandlerError::Unavailable(reason),
        }
    }
}

impl From<CredentialStoreError> for HandlerError {
    fn from(err: CredentialStoreError) -> Self {
        match err {
            CredentialStoreError::Timeout { .. } => HandlerError::UpstreamTimeout(err.to_string()),
            CredentialStoreError::Unavailable(reason) => HandlerError::Unavailable(reason),
            CredentialStoreError::Internal(reason) => HandlerError::Internal(reason),
        }
    }
}

/// Every failure the gateway can surface, one per HTTP status class.
///
/// Converted to a response by the `IntoResponse` impl in
/// [`crate::gateway::response`]; nothing escapes the dispatcher unmapped.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Malformed request (400)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No registered route matches (404)
    #[error("no route for {method} {path}")]
    NoMatch { method: String, path: String },

    /// Record missing in the data store (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// Authentication failed (401)
    #[error("authentication failed: {0}")]
    Unauthorized(#[from] AuthError),

    /// Conflicting write (409)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Identity source did not answer in time (503)
    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// Upstream collaborator unavailable (503)
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Handler failed unexpectedly or panicked (500)
    #[error("handler fault: {0}")]
    HandlerFault(String),
}

impl From<HandlerError> for GatewayError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::BadRequest(message) => GatewayError::BadRequest(message),
            HandlerError::NotFound(what) => GatewayError::NotFound(what),
            HandlerError::Conflict(what) => GatewayError::Conflict(what),
            HandlerError::Unauthorized(reason) => GatewayError::Unauthorized(reason),
            HandlerError::UpstreamTimeout(reason) => GatewayError::UpstreamTimeout(reason),
            HandlerError::Unavailable(reason) => GatewayError::Unavailable(reason),
            HandlerError::Internal(detail) => GatewayError::HandlerFault(detail),
        }
    }
}
