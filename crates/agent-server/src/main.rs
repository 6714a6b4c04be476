//! sheets-agent HTTP Server
//!
//! Axum front end that hands each chat message to the agent and returns
//! its reply. Spreadsheet access goes through Google Sheets when an access
//! token is configured, otherwise through an in-memory demo spreadsheet.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{Agent, AgentConfig, ToolDispatcher};
use agent_runtime::create_provider;
use sheets_assistant::{
    GoogleSheetsBackend, MemorySheets, SheetPromptBuilder, SheetsBackend, Workbook, register_tools,
};

use crate::config::Settings;
use crate::handlers::{chat_handler, health_check, help};
use crate::state::AppState;

/// Spreadsheet id of the in-memory demo tracker
const DEMO_SPREADSHEET: &str = "demo";

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/help", get(help))
        .route("/api/chat", post(chat_handler))
        .with_state(state)
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},tower_http=debug")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before reading LOG_LEVEL
    dotenvy::dotenv().ok();
    let settings = Settings::from_env();
    init_tracing(&settings.log_level);

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Running startup checks...");

    // LLM provider: construction failure is fatal, an unreachable vendor is not
    let provider = create_provider(&settings.provider).with_context(|| {
        format!("failed to create LLM provider '{}'", settings.provider.provider)
    })?;

    match provider.health_check().await {
        Ok(true) => tracing::info!(
            provider = provider.name(),
            model = provider.model(),
            "✓ LLM provider reachable"
        ),
        Ok(false) => tracing::warn!(provider = provider.name(), "⚠ LLM provider health check failed"),
        Err(e) => tracing::warn!(provider = provider.name(), error = %e, "⚠ LLM provider health check failed"),
    }

    // Spreadsheet backend
    let (backend, default_spreadsheet): (Arc<dyn SheetsBackend>, Option<String>) =
        if settings.sheets.has_credentials() {
            let backend = GoogleSheetsBackend::from_config(&settings.sheets)
                .context("failed to create Google Sheets backend")?;
            (Arc::new(backend), settings.sheets.default_spreadsheet_id.clone())
        } else {
            tracing::warn!("⚠ GOOGLE_ACCESS_TOKEN not set - using the in-memory demo spreadsheet");
            (Arc::new(MemorySheets::demo()), Some(DEMO_SPREADSHEET.into()))
        };

    if backend.health_check().await {
        tracing::info!(
            backend = backend.name(),
            service_account = ?backend.service_account(),
            "✓ Spreadsheet backend reachable"
        );
    } else {
        tracing::warn!(backend = backend.name(), "⚠ Spreadsheet backend health check failed");
    }

    let workbook = Arc::new(Workbook::new(backend, default_spreadsheet));

    let mut tools = ToolDispatcher::new();
    register_tools(&mut tools, &workbook);

    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    let agent = Agent::new(
        provider,
        Arc::new(tools),
        Arc::new(SheetPromptBuilder::new(workbook.clone())),
        AgentConfig::default(),
    );

    if settings.access.is_open() {
        tracing::warn!("⚠ ALLOWED_USERS is empty - every user may talk to the agent");
    }

    let state = AppState::new(agent, workbook, settings.access);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 sheets-agent server running on http://{}", settings.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health    - Health check");
    tracing::info!("  GET  /api/help  - Usage instructions");
    tracing::info!("  POST /api/chat  - Send message");

    axum::serve(listener, app).await?;

    Ok(())
}
