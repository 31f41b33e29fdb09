//! AiiDA Gateway - an authenticated REST API in front of a provenance store.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aiida_gateway::{
    auth::{Credential, CredentialStore, InMemoryCredentialSource, SessionTokenIssuer},
    config::{Cli, Command, HashSecretConfig, IssueTokenConfig, ServeConfig, TokenOutputFormat},
    gateway::{Gateway, GatewayConfig},
    routers::{default_registry, RouterState},
    server::{create_router, RouterConfig},
    store::{InMemoryStore, ProvenanceStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => run_serve(config).await,
        Command::HashSecret(config) => run_hash_secret(config),
        Command::IssueToken(config) => run_issue_token(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("AiiDA Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Token TTL: {}s", config.token_ttl);
    info!("  Credential lookup timeout: {}ms", config.credential_timeout_ms);
    info!("  Max body size: {} bytes", config.max_body_bytes);

    let credential_source = match &config.credentials_file {
        Some(path) => match InMemoryCredentialSource::from_json_file(path) {
            Ok(source) => {
                info!("  Credentials: {} loaded from {}", source.len(), path.display());
                source
            }
            Err(e) => {
                error!("Failed to load credentials: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("  Credentials: NONE - every login attempt will be rejected");
            warn!("        Provide --credentials-file to enable logins");
            InMemoryCredentialSource::new()
        }
    };

    let store: Arc<dyn ProvenanceStore> = match &config.data_file {
        Some(path) => match InMemoryStore::from_json_file(path) {
            Ok(store) => {
                info!("  Data store: seeded from {}", path.display());
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to load data file: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("  Data store: empty in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let tokens = match SessionTokenIssuer::new(config.token_secret_or_empty(), config.token_ttl()) {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let credentials =
        CredentialStore::new(credential_source).with_timeout(config.credential_timeout());
    let state = RouterState::new(credentials, tokens.clone(), store);

    let registry = match default_registry(&state) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to build route registry: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for group in registry.groups() {
        info!("  Route group '{}' at {}", group.name(), group.prefix());
    }

    let gateway = Arc::new(Gateway::new(
        registry,
        tokens,
        GatewayConfig::default().with_max_body_bytes(config.max_body_bytes),
    ));
    let router = create_router(gateway, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  curl http://{}/health", addr);
    info!(
        "  curl -X POST http://{}/auth/token -d 'username=<id>&password=<secret>'",
        addr
    );

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "aiida_gateway=debug,tower_http=debug"
    } else {
        "aiida_gateway=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Hash Secret Command
// =============================================================================

fn run_hash_secret(config: HashSecretConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let hash = match bcrypt::hash(&config.secret, config.cost) {
        Ok(hash) => hash,
        Err(e) => {
            eprintln!("Error: failed to hash secret: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.identifier {
        Some(identifier) => {
            let entry = Credential::new(identifier, hash);
            match serde_json::to_string_pretty(&entry) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => println!("{}", hash),
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Issue Token Command
// =============================================================================

fn run_issue_token(config: IssueTokenConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let issued = match SessionTokenIssuer::new(&config.secret, Duration::from_secs(config.ttl))
        .and_then(|issuer| issuer.issue(&config.subject))
    {
        Ok(issued) => issued,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        TokenOutputFormat::Token => println!("{}", issued.token),
        TokenOutputFormat::Json => {
            let json = serde_json::json!({
                "access_token": issued.token,
                "token_type": "bearer",
                "subject": issued.claims.sub,
                "issued_at": issued.claims.iat,
                "expires_at": issued.claims.exp,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(rendered) => println!("{}", rendered),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}
