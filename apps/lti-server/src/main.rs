//! ltix LTI server.
//!
//! Hosts the LTI endpoints under `/lti` over in-memory collaborators,
//! optionally seeded from `LTI_TOOLS_FILE`.

mod config;
mod logging;
mod seed;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use config::Config;
use ltix_api::store::{InMemoryAssetProcessorStore, InMemorySessionStore, InMemoryToolRegistry};
use ltix_api::{lti_router, LtiState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };
    logging::init_logging(&config.log_level);
    info!(issuer = %config.issuer, keys = config.signing_keys.len(), "Configuration loaded");

    let registry = match &config.tools_file {
        Some(path) => match seed::load_registry(path) {
            Ok(registry) => registry,
            Err(e) => {
                tracing::error!("Failed to seed registry: {e}");
                std::process::exit(1);
            }
        },
        None => InMemoryToolRegistry::default(),
    };

    let state = LtiState::new(
        Arc::new(registry),
        Arc::new(InMemorySessionStore::default()),
        Arc::new(InMemoryAssetProcessorStore::default()),
        config.issuer.clone(),
        config.signing_keys.clone(),
    )
    .with_access_token_lifetime(config.access_token_lifetime_secs)
    .with_id_token_lifetime(config.id_token_lifetime_secs)
    .with_oauth1_timestamp_window(config.oauth1_timestamp_window_secs)
    .with_jwks_timeout(config.jwks_timeout);

    let app = build_app(state, &config.cors_origins);

    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid bind address '{}': {e}", config.bind_addr());
            std::process::exit(1);
        }
    };

    info!(%addr, "Server listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    info!("Server stopped");
}

fn build_app(state: LtiState, cors_origins: &[String]) -> Router {
    Router::new()
        .nest("/lti", lti_router(state))
        .layer(build_cors_layer(cors_origins))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// Cross-origin access to the key set and token endpoints only.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    let allow_origin = AllowOrigin::predicate(
        move |origin: &HeaderValue, parts: &axum::http::request::Parts| {
            let path = parts.uri.path();
            let is_public = path.ends_with("/certs") || path.ends_with("/token");
            let is_allowed = is_public && allowed.contains(origin);
            if !is_allowed && is_public {
                tracing::warn!(
                    target: "security",
                    origin = %origin.to_str().unwrap_or("<non-utf8>"),
                    "CORS origin rejected"
                );
            }
            is_allowed
        },
    );

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
