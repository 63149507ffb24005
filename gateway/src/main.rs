mod api;
mod routes;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

// Internal imports
use crate::routes::{router, AppState};
use tabchat_core::chat::Assistant;
use tabchat_core::config::Settings;
use tabchat_core::llm::Brain;
use tabchat_core::memory::ConversationStore;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging Setup
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .compact()
        .init();

    info!("TabChat Gateway Initializing...");

    // 2. Settings (.env + environment)
    let settings = Settings::from_env().context("Failed to load settings")?;

    // 3. The Brain. No credential here: each request brings its own.
    let brain = Arc::new(Brain::new(settings.llm.clone()));

    // 4. Conversation memory, shared by every request
    let store = Arc::new(ConversationStore::new(&settings.memory));
    info!(
        "Conversation store ready. Capacity: {}, idle TTL: {:?}",
        settings.memory.max_conversations, settings.memory.idle_ttl
    );

    // 5. Routes
    let state = AppState {
        assistant: Assistant::new(brain, store),
    };
    let app = router(state);

    // 6. Start Server
    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    info!("Gateway listening on {}...", settings.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Gateway stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
