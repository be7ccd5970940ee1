// Chronicle Quest - OpenRouter proxy server

pub mod api;
pub mod config;
pub mod proxy;

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ConfigOrigin;
use crate::proxy::EnvMap;

pub async fn run() -> Result<()> {
    let config_path = config::resolve_config_path();
    let loaded = config::load_config(&config_path);

    // Initialize tracing; RUST_LOG wins over the config's debug flag
    let debug = matches!(&loaded, Ok((c, _)) if c.debug);
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let app_config = match loaded {
        Ok((c, ConfigOrigin::File)) => {
            tracing::info!("Config loaded from {:?}", config_path);
            c
        }
        Ok((c, ConfigOrigin::DefaultWritten)) => {
            tracing::info!("Default config written to {:?}", config_path);
            c
        }
        Ok((c, ConfigOrigin::DefaultUnsaved(e))) => {
            tracing::warn!("Using default config, could not write {:?}: {:#}", config_path, e);
            c
        }
        Err(e) => {
            tracing::error!("Failed to initialize config: {:#}", e);
            return Err(e);
        }
    };

    // Environment is read once; actions resolve their settings from this snapshot
    let env = Arc::new(EnvMap::from_process());

    tracing::info!("Starting API server...");
    api::start_server(app_config, env).await
}
