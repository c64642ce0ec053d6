//! Main Entrypoint for the Parley API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the completion client and the web search provider.
//! 3. Applying persona overrides from the prompts directory.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use parley_api::{config::Config, prompts::load_prompts, router::create_router, state::AppState};
use parley_core::{
    AgentProfile, OrchestratorConfig,
    llm_client::{CompletionClient, OpenAICompletionClient},
    search::{DuckDuckGoSearch, SearchProvider},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let completion_client: Arc<dyn CompletionClient> = Arc::new(OpenAICompletionClient::new(
        Some(config.api_key.clone()),
        config.provider.api_base(),
    ));

    let search_timeout = config.call_timeout.unwrap_or(Duration::from_secs(30));
    let search: Arc<dyn SearchProvider> = Arc::new(
        DuckDuckGoSearch::new(config.search_max_results, search_timeout)
            .context("Failed to build web search client")?,
    );

    let mut prompts = load_prompts(&config.prompts_path)?;
    let mut planner = AgentProfile::planner().with_model(config.planner_model.clone());
    if let Some(prompt) = prompts.remove("planner") {
        planner = planner.with_system_prompt(prompt);
    }
    let mut speaker = AgentProfile::speaker().with_model(config.speaker_model.clone());
    if let Some(prompt) = prompts.remove("speaker") {
        speaker = speaker.with_system_prompt(prompt);
    }

    let orchestrator_config = OrchestratorConfig {
        max_turns: config.max_turns,
        call_timeout: config.call_timeout,
    };

    let app_state = Arc::new(
        AppState::new(completion_client, search, orchestrator_config)
            .with_profiles(planner, speaker),
    );

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.provider,
        planner_model = %config.planner_model,
        speaker_model = %config.speaker_model,
        max_turns = config.max_turns,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
