//! Authentication primitives.
//!
//! - [`CredentialStore`] checks identifier/secret pairs against an external
//!   identity source ([`CredentialSource`])
//! - [`SessionTokenIssuer`] mints and validates the stateless bearer tokens
//!   handed out after a successful login

mod credentials;
mod token;

pub use credentials::{
    Credential, CredentialSource, CredentialStore, InMemoryCredentialSource,
    DEFAULT_LOOKUP_TIMEOUT,
};
pub use token::{
    now_ms, IssuedToken, SessionTokenIssuer, TokenClaims, DEFAULT_TOKEN_TTL, MIN_SECRET_LEN,
};
