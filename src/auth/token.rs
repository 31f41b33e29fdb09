//! Stateless session tokens signed with HMAC-SHA256.
//!
//! # Token Format
//!
//! A token is the hex-encoded JSON claims followed by the hex-encoded MAC of
//! that hex text:
//!
//! ```text
//! token = hex(claims_json) "." hex(HMAC-SHA256(secret, hex(claims_json)))
//! ```
//!
//! Both halves are lowercase hex. The signature is compared as text, so a
//! change to any byte of the token (case included) fails validation.
//!
//! # Security Properties
//!
//! - **No session table**: validity is a pure function of the token, the
//!   current time and the process-wide secret
//! - **Time-limited**: tokens expire after a configurable TTL
//! - **Constant-time comparison**: signature verification uses constant-time
//!   comparison to prevent timing attacks
//!
//! # Example
//!
//! ```rust
//! use aiida_gateway::auth::SessionTokenIssuer;
//! use std::time::Duration;
//!
//! let issuer = SessionTokenIssuer::new(
//!     "an-example-secret-that-is-long-enough",
//!     Duration::from_secs(1800),
//! )
//! .unwrap();
//!
//! let issued = issuer.issue("alice@example.com").unwrap();
//! let claims = issuer.validate(&issued.token).unwrap();
//! assert_eq!(claims.sub, "alice@example.com");
//! ```

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::{AuthError, IssuerError};

// =============================================================================
// Types
// =============================================================================

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Default token lifetime (30 minutes).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Claims carried inside a session token.
///
/// Timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject identifier the token was issued for
    pub sub: String,

    /// Issue time
    pub iat: u64,

    /// Expiry time; the token is invalid from this instant on
    pub exp: u64,
}

impl TokenClaims {
    pub fn is_expired(&self, reference_ms: u64) -> bool {
        reference_ms >= self.exp
    }
}

/// A freshly minted token together with its claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

impl IssuedToken {
    /// Expiry as Unix epoch milliseconds.
    pub fn expires_at(&self) -> u64 {
        self.claims.exp
    }
}

// =============================================================================
// Session Token Issuer
// =============================================================================

/// Issues and validates bearer tokens.
///
/// The issuer is immutable after construction and cheap to clone, so one
/// instance is shared by every in-flight request.
#[derive(Clone)]
pub struct SessionTokenIssuer {
    /// MAC keyed with the process-wide secret; cloned per signature
    mac: HmacSha256,

    ttl: Duration,
}

impl fmt::Debug for SessionTokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionTokenIssuer {
    /// Create an issuer from a secret key and token lifetime.
    ///
    /// The secret must be at least [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Result<Self, IssuerError> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_LEN {
            return Err(IssuerError::SecretTooShort {
                min: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }

        let mac = HmacSha256::new_from_slice(secret).map_err(|_| IssuerError::SecretTooShort {
            min: MIN_SECRET_LEN,
            actual: secret.len(),
        })?;

        Ok(Self { mac, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` expiring one TTL from now.
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, IssuerError> {
        self.issue_at(subject, now_ms())
    }

    /// Issue a token as if the current time were `issued_at_ms`.
    pub fn issue_at(&self, subject: &str, issued_at_ms: u64) -> Result<IssuedToken, IssuerError> {
        let ttl_ms = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX);
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: issued_at_ms,
            exp: issued_at_ms.saturating_add(ttl_ms),
        };

        let payload =
            serde_json::to_vec(&claims).map_err(|e| IssuerError::Encoding(e.to_string()))?;
        let payload_hex = hex::encode(payload);
        let signature = self.compute_signature(payload_hex.as_bytes());

        Ok(IssuedToken {
            token: format!("{}.{}", payload_hex, signature),
            claims,
        })
    }

    /// Validate a token against the current time.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.validate_at(token, now_ms())
    }

    /// Validate a token against an explicit clock reading (epoch milliseconds).
    ///
    /// The signature is checked before the payload is decoded, so nothing
    /// from an unauthenticated payload is parsed.
    pub fn validate_at(&self, token: &str, reference_ms: u64) -> Result<TokenClaims, AuthError> {
        let (payload_hex, signature_hex) = token.split_once('.').ok_or(AuthError::Malformed)?;
        if payload_hex.is_empty() || signature_hex.is_empty() {
            return Err(AuthError::Malformed);
        }

        let expected = self.compute_signature(payload_hex.as_bytes());
        if !bool::from(signature_hex.as_bytes().ct_eq(expected.as_bytes())) {
            if hex::decode(signature_hex).is_err() {
                return Err(AuthError::Malformed);
            }
            return Err(AuthError::InvalidSignature);
        }

        let payload = hex::decode(payload_hex).map_err(|_| AuthError::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| AuthError::Malformed)?;

        if claims.sub.is_empty() {
            return Err(AuthError::Malformed);
        }

        if claims.is_expired(reference_ms) {
            debug!(
                subject = %claims.sub,
                expires_at = claims.exp,
                "Rejecting expired token"
            );
            return Err(AuthError::Expired {
                expires_at: claims.exp,
                current_time: reference_ms,
            });
        }

        Ok(claims)
    }

    /// Compute the lowercase hex HMAC-SHA256 of `bytes`.
    fn compute_signature(&self, bytes: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(bytes);
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Current time as Unix epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// =============================================================================
// Tests
// =============================================================================
