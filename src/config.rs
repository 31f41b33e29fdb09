//! Configuration management for the gateway.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap, split into subcommands
//! - Environment variables with `AIIDA_GATEWAY_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Subcommands
//!
//! - `serve` - Run the HTTP gateway
//! - `hash-secret` - Produce a bcrypt hash for the credentials file
//! - `issue-token` - Mint a bearer token offline
//!
//! # Environment Variables
//!
//! - `AIIDA_GATEWAY_HOST` - Server bind address (default: 0.0.0.0)
//! - `AIIDA_GATEWAY_PORT` - Server port (default: 3000)
//! - `AIIDA_GATEWAY_TOKEN_SECRET` - HMAC secret for bearer tokens (required)
//! - `AIIDA_GATEWAY_TOKEN_TTL` - Token lifetime in seconds (default: 1800)
//! - `AIIDA_GATEWAY_CREDENTIALS_FILE` - JSON credentials file
//! - `AIIDA_GATEWAY_DATA_FILE` - JSON file seeding the user store
//! - `AIIDA_GATEWAY_CREDENTIAL_TIMEOUT_MS` - Identity lookup budget (default: 2000)
//! - `AIIDA_GATEWAY_MAX_BODY_BYTES` - Request body limit (default: 1 MiB)
//! - `AIIDA_GATEWAY_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::auth::{DEFAULT_LOOKUP_TIMEOUT, DEFAULT_TOKEN_TTL, MIN_SECRET_LEN};
use crate::gateway::DEFAULT_MAX_BODY_BYTES;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default token lifetime in seconds.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = DEFAULT_TOKEN_TTL.as_secs();

/// Default credential lookup timeout in milliseconds.
pub const DEFAULT_CREDENTIAL_TIMEOUT_MS: u64 = DEFAULT_LOOKUP_TIMEOUT.as_millis() as u64;

// =============================================================================
// CLI
// =============================================================================

/// AiiDA Gateway - an authenticated REST API in front of a provenance store.
#[derive(Parser, Debug, Clone)]
#[command(name = "aiida-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP gateway.
    Serve(ServeConfig),

    /// Hash a secret with bcrypt for use in the credentials file.
    HashSecret(HashSecretConfig),

    /// Issue a bearer token without going through the login endpoint.
    IssueToken(IssueTokenConfig),
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "AIIDA_GATEWAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "AIIDA_GATEWAY_PORT")]
    pub port: u16,

    /// Largest accepted request body in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES, env = "AIIDA_GATEWAY_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key for HMAC-SHA256 token signing (at least 32 bytes).
    #[arg(long, env = "AIIDA_GATEWAY_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS, env = "AIIDA_GATEWAY_TOKEN_TTL")]
    pub token_ttl: u64,

    /// JSON file listing `{identifier, secret_hash}` credentials.
    ///
    /// Without it, every login attempt is rejected.
    #[arg(long, env = "AIIDA_GATEWAY_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// Budget for a single identity lookup, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_CREDENTIAL_TIMEOUT_MS, env = "AIIDA_GATEWAY_CREDENTIAL_TIMEOUT_MS")]
    pub credential_timeout_ms: u64,

    // =========================================================================
    // Data Store Configuration
    // =========================================================================
    /// JSON file of users to seed the in-memory store with.
    #[arg(long, env = "AIIDA_GATEWAY_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "AIIDA_GATEWAY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        match &self.token_secret {
            None => {
                return Err("No token secret provided. \
                     Set --token-secret or AIIDA_GATEWAY_TOKEN_SECRET"
                    .to_string())
            }
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(format!(
                    "token secret must be at least {} bytes (got {})",
                    MIN_SECRET_LEN,
                    secret.len()
                ))
            }
            Some(_) => {}
        }

        if self.token_ttl == 0 {
            return Err("token_ttl must be greater than 0".to_string());
        }
        if self.credential_timeout_ms == 0 {
            return Err("credential_timeout_ms must be greater than 0".to_string());
        }
        if self.max_body_bytes == 0 {
            return Err("max_body_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the token secret, or an empty string (call validate() first).
    pub fn token_secret_or_empty(&self) -> &str {
        self.token_secret.as_deref().unwrap_or("")
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl)
    }

    pub fn credential_timeout(&self) -> Duration {
        Duration::from_millis(self.credential_timeout_ms)
    }
}

// =============================================================================
// Hash Secret
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct HashSecretConfig {
    /// Secret to hash.
    #[arg(long, env = "AIIDA_GATEWAY_SECRET", hide_env_values = true)]
    pub secret: String,

    /// bcrypt cost factor (4-31).
    #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
    pub cost: u32,

    /// Also print a credentials-file entry for this identifier.
    #[arg(long)]
    pub identifier: Option<String>,
}

impl HashSecretConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("secret must not be empty".to_string());
        }
        if !(4..=31).contains(&self.cost) {
            return Err("cost must be between 4 and 31".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Issue Token
// =============================================================================

/// Output format for the issue-token command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenOutputFormat {
    /// The bare token
    #[default]
    Token,
    /// JSON with token, subject and expiry
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct IssueTokenConfig {
    /// Secret key the gateway signs tokens with.
    #[arg(long, env = "AIIDA_GATEWAY_TOKEN_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Subject (login identifier) to issue the token for.
    #[arg(long)]
    pub subject: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub ttl: u64,

    /// Output format.
    #[arg(long, value_enum, default_value_t = TokenOutputFormat::Token)]
    pub format: TokenOutputFormat,
}

impl IssueTokenConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.len() < MIN_SECRET_LEN {
            return Err(format!(
                "secret must be at least {} bytes",
                MIN_SECRET_LEN
            ));
        }
        if self.subject.is_empty() {
            return Err("subject must not be empty".to_string());
        }
        if self.ttl == 0 {
            return Err("ttl must be greater than 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
