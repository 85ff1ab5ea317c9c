use std::sync::Arc;

use career_assist::api::{ConversationApi, HttpConversationApi};
use career_assist::cli::{CliNotifier, Repl, spawn_renderer};
use career_assist::config::ClientConfig;
use career_assist::error::Result;
use career_assist::session::{ConversationStore, MessageExchangeController};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (config, api) = connect()?;

    eprintln!("🤖 Career Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.api_base_url);
    eprintln!("   Timeout: {}s\n", config.request_timeout.as_secs());

    let api = Arc::new(api);
    match api.health().await {
        Ok(report) if report.is_healthy() => tracing::info!("Conversation service is healthy"),
        Ok(report) => tracing::warn!(status = %report.status, components = ?report.components, "Conversation service reports problems"),
        Err(e) => tracing::warn!(error = %e, "Health check failed; continuing anyway"),
    }

    let store = ConversationStore::new(api, Arc::new(CliNotifier), config.event_capacity);
    let renderer = spawn_renderer(&store);

    let controller = MessageExchangeController::new(Arc::clone(&store));
    let mut repl = Repl::new(controller, BufReader::new(tokio::io::stdin()));
    repl.run().await;

    renderer.abort();
    Ok(())
}

/// Read configuration and build the HTTP client.
fn connect() -> Result<(ClientConfig, HttpConversationApi)> {
    let config = ClientConfig::from_env()?;
    let api = HttpConversationApi::new(&config)?;
    Ok((config, api))
}
