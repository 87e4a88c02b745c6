//! magent HTTP Server
//!
//! Axum-based server exposing one tool-using agent over REST.

mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::{get, post}};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magent_core::{AgentBuilder, DateTimeTool, LlmProvider};
use magent_runtime::{OpenAiConfig, OpenAiProvider};

use crate::handlers::{
    chat_handler, default_messages, health_check, list_threads, thread_messages,
};
use crate::state::AppState;

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize model backend
    let config = OpenAiConfig::from_env();
    tracing::info!("Model backend: {} ({})", config.base_url, config.model);
    if config.api_key.is_none() {
        tracing::warn!("⚠ No API key set (MAGENT_API_KEY / OPENAI_API_KEY)");
    }
    let provider = Arc::new(OpenAiProvider::new(config)?);

    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Model backend reachable"),
        Ok(false) | Err(_) => tracing::warn!("⚠ Model backend not reachable - chat requests will fail"),
    }

    // Build agent
    let mut builder = AgentBuilder::new()
        .provider(provider)
        .tool(DateTimeTool);

    if let Some(prompt) = env_var("MAGENT_SYSTEM_PROMPT") {
        builder = builder.system_prompt(prompt);
    }
    if let Some(max) = env_var("MAGENT_MAX_ITERATIONS") {
        builder = builder.max_iterations(max.parse()?);
    }
    if let Some(secs) = env_var("MAGENT_CALL_TIMEOUT_SECS") {
        builder = builder.call_timeout(Duration::from_secs(secs.parse()?));
    }

    let agent = builder.build()?;

    tracing::info!("Registered {} tools:", agent.tools().len());
    for name in agent.tools().names() {
        tracing::info!("  • {}", name);
    }

    let state = AppState {
        agent: Arc::new(agent),
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat_handler))
        .route("/api/messages", get(default_messages))
        .route("/api/threads", get(list_threads))
        .route("/api/threads/{id}/messages", get(thread_messages))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("magent server running on http://{}", addr);
    tracing::info!("  GET  /health                     - Health check");
    tracing::info!("  POST /api/chat                   - Run a turn");
    tracing::info!("  GET  /api/messages               - Default thread history");
    tracing::info!("  GET  /api/threads                - Named threads");
    tracing::info!("  GET  /api/threads/{{id}}/messages - Thread history");

    axum::serve(listener, app).await?;

    Ok(())
}
