// HTTP API Server module

use anyhow::{Context, Result};
use axum::{
    http::Method,
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::proxy::{Dispatcher, EnvSource, ProviderClient, RuntimeConfig};

mod handlers;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub env: Arc<dyn EnvSource>,
    pub upstream_timeout: Duration,
    /// Cancelled on shutdown; every upstream call runs under a child token.
    pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/openrouter", any(handlers::missing_action))
        .route("/api/openrouter/", any(handlers::missing_action))
        .route("/api/openrouter/:action", any(handlers::openrouter_action))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: AppConfig, env: Arc<dyn EnvSource>) -> Result<()> {
    if let Err(e) = RuntimeConfig::resolve(env.as_ref()) {
        tracing::warn!("{}; every action will fail until it is set", e);
    }

    let http_client = ProviderClient::build_http_client(config.proxy_url())
        .context("Failed to build OpenRouter HTTP client")?;
    let shutdown = CancellationToken::new();
    let state = AppState {
        dispatcher: Dispatcher::new(Arc::new(ProviderClient::new(http_client))),
        env,
        upstream_timeout: config.upstream_timeout(),
        shutdown: shutdown.clone(),
    };

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            tracing::info!("Shutdown requested, cancelling in-flight upstream calls");
            shutdown.cancel();
        })
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}
