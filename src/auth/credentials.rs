//! Credential verification against an external identity source.
//!
//! The identity source is abstracted by [`CredentialSource`]; the gateway only
//! ever talks to it through [`CredentialStore`], which bounds every lookup by a
//! timeout and checks secrets against bcrypt hashes.
//!
//! An unknown identifier and a wrong secret are indistinguishable to callers:
//! both yield `Ok(false)`, and an unknown identifier still pays for one bcrypt
//! verification against a dummy hash.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CredentialStoreError, LoadError};

/// Default budget for a single identity lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Secret used to build the dummy hash for unknown identifiers.
const DUMMY_SECRET: &str = "aiida-gateway-dummy-secret";

// =============================================================================
// Credential
// =============================================================================

/// A provisioned credential: identifier plus bcrypt hash of the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub identifier: String,
    pub secret_hash: String,
}

impl Credential {
    pub fn new(identifier: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret_hash: secret_hash.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret_hash", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// CredentialSource Trait
// =============================================================================

/// An identity source the gateway can query for credentials.
///
/// Implementations may block on network I/O; the caller applies the timeout.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetch the credential for `identifier`, if one exists.
    async fn lookup(&self, identifier: &str) -> Result<Option<Credential>, CredentialStoreError>;
}

/// Credentials held in memory, typically loaded from a JSON file at startup.
///
/// The file holds a list of `{"identifier": ..., "secret_hash": ...}` objects.
#[derive(Debug, Default)]
pub struct InMemoryCredentialSource {
    credentials: HashMap<String, Credential>,
}

impl InMemoryCredentialSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential, replacing any previous one for the same identifier.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credentials
            .insert(credential.identifier.clone(), credential);
        self
    }

    /// Build a source from a list, rejecting duplicate identifiers.
    pub fn from_credentials(
        credentials: impl IntoIterator<Item = Credential>,
    ) -> Result<Self, LoadError> {
        let mut map = HashMap::new();
        for credential in credentials {
            if map.contains_key(&credential.identifier) {
                return Err(LoadError::Duplicate(credential.identifier));
            }
            map.insert(credential.identifier.clone(), credential);
        }
        Ok(Self { credentials: map })
    }

    /// Load credentials from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let credentials: Vec<Credential> =
            serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_credentials(credentials)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl CredentialSource for InMemoryCredentialSource {
    async fn lookup(&self, identifier: &str) -> Result<Option<Credential>, CredentialStoreError> {
        Ok(self.credentials.get(identifier).cloned())
    }
}

// =============================================================================
// Credential Store Adapter
// =============================================================================

/// Internal verification outcome. Only the boolean leaves this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerifyOutcome {
    Verified,
    NotFound,
    Mismatch,
}

/// Verifies identifier/secret pairs against a [`CredentialSource`].
pub struct CredentialStore {
    source: Arc<dyn CredentialSource>,
    timeout: Duration,
    hash_cost: u32,
    dummy_hash: Arc<OnceLock<String>>,
}

impl CredentialStore {
    /// Create an adapter with the default lookup timeout and bcrypt cost.
    pub fn new(source: impl CredentialSource + 'static) -> Self {
        Self::from_arc(Arc::new(source))
    }

    pub fn from_arc(source: Arc<dyn CredentialSource>) -> Self {
        Self {
            source,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
            hash_cost: bcrypt::DEFAULT_COST,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Set the budget for a single identity lookup.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the bcrypt cost used for the dummy hash.
    ///
    /// Should match the cost of provisioned hashes so unknown identifiers take
    /// as long to reject as wrong secrets.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check a secret for an identifier.
    ///
    /// Returns `Ok(true)` only for an existing identifier with a matching
    /// secret. Errors are reserved for an unreachable or slow identity source.
    pub async fn verify(&self, identifier: &str, secret: &str) -> Result<bool, CredentialStoreError> {
        let outcome = self.check(identifier, secret).await?;
        match outcome {
            VerifyOutcome::Verified => debug!(identifier, "Credentials verified"),
            VerifyOutcome::NotFound => debug!(identifier, "Credential lookup: no such identity"),
            VerifyOutcome::Mismatch => debug!(identifier, "Credential lookup: secret mismatch"),
        }
        Ok(outcome == VerifyOutcome::Verified)
    }

    async fn check(&self, identifier: &str, secret: &str) -> Result<VerifyOutcome, CredentialStoreError> {
        if identifier.is_empty() {
            return Ok(VerifyOutcome::NotFound);
        }

        let credential = tokio::time::timeout(self.timeout, self.source.lookup(identifier))
            .await
            .map_err(|_| {
                warn!(
                    identifier,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Credential lookup timed out"
                );
                CredentialStoreError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            })??;

        let found = credential.is_some();
        let stored_hash = credential.map(|c| c.secret_hash);
        let secret = secret.to_owned();
        let dummy_hash = Arc::clone(&self.dummy_hash);
        let cost = self.hash_cost;

        let matched = tokio::task::spawn_blocking(move || {
            let hash = match stored_hash {
                Some(hash) => hash,
                None => dummy_hash
                    .get_or_init(|| bcrypt::hash(DUMMY_SECRET, cost).unwrap_or_default())
                    .clone(),
            };
            match bcrypt::verify(&secret, &hash) {
                Ok(matched) => matched,
                Err(e) => {
                    if found {
                        warn!(error = %e, "Stored credential hash is unusable");
                    }
                    false
                }
            }
        })
        .await
        .map_err(hashing_task_error)?;

        Ok(match (found, matched) {
            (false, _) => VerifyOutcome::NotFound,
            (true, true) => VerifyOutcome::Verified,
            (true, false) => VerifyOutcome::Mismatch,
        })
    }
}

/// A failed hashing task is a local fault, never an upstream outage.
fn hashing_task_error(err: tokio::task::JoinError) -> CredentialStoreError {
    if err.is_panic() {
        warn!("Hash verification task panicked");
    }
    CredentialStoreError::Internal(format!("hash verification failed: {}", err))
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("timeout", &self.timeout)
            .field("hash_cost", &self.hash_cost)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
