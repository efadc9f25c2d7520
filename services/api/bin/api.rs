//! Pathwise HTTP host.
//!
//! Reads settings from the environment, opens the JSON session store, wires
//! the completion client for the chosen provider and serves the advisor,
//! teacher and storage routes until Ctrl+C.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use pathwise_api::{
    config::Config,
    router::create_router,
    state::{AppState, BasePrompts},
};
use pathwise_core::{FileStore, SharedStore, llm_client::OpenAICompatibleClient};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Resolves once Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    info!("Ctrl+C received, draining connections.");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Settings
    let config = Config::from_env().context("Invalid environment settings")?;

    // Logging
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Settings loaded.");

    // Store
    let store: SharedStore = Arc::new(
        FileStore::open(config.store_path.clone(), config.store_quota_bytes)
            .with_context(|| format!("Failed to open store at {}", config.store_path.display()))?,
    );
    info!(path = %config.store_path.display(), "Session store opened.");

    // Prompts and completion client
    let base_prompts = BasePrompts::load(&config.prompts_path);
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.api_key)
        .with_api_base(config.provider.api_base());
    let llm_client = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));

    let app_state = Arc::new(AppState::new(
        store,
        llm_client,
        base_prompts,
        config.handoff_url.clone(),
    ));

    // Routes
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // Serve
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        handoff = config.handoff_url.is_some(),
        "Listening"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Stopped.");
    Ok(())
}
