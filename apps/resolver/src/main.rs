mod addressing;
mod config;
mod errors;
mod llm_client;
mod nearest_address;
mod profile;
mod prompting;
mod resolution;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{ApiSurface, LlmClient};
use crate::nearest_address::NearestAddressFinder;
use crate::profile::JsonFileProfileStore;
use crate::resolution::ResolutionEngine;
use crate::routes::build_router;
use crate::session::ConversationSession;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting form resolver v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client and the conversation surface on top of it
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let surface = Arc::new(ApiSurface::new(llm, config.max_history_messages));

    let session = Arc::new(ConversationSession::new(surface));

    let profile_store = Arc::new(JsonFileProfileStore::new(config.profile_path.clone()));
    info!("Profile store: {}", config.profile_path.display());

    let engine = Arc::new(
        ResolutionEngine::new(
            session.clone(),
            profile_store.clone(),
            config.service_name.clone(),
        )
        .with_retry_backoff(config.retry_backoff),
    );

    let addresses = Arc::new(
        NearestAddressFinder::new(session.clone(), profile_store)
            .with_retry_backoff(config.retry_backoff),
    );

    // Build app state
    let state = AppState {
        engine,
        addresses,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the form-filling extension

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Requests are drained; the conversation must not outlive the process.
    session.release().await;
    info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
