//! crawler-gateway server entry point.
//!
//! Loads configuration, wires the event bus and lifecycle listeners, then
//! runs the Axum HTTP server until ctrl-c.

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crawler_gateway::api;
use crawler_gateway::app_state::AppState;
use crawler_gateway::config::{AppConfig, EnvState};
use crawler_gateway::domain::EventBus;
use crawler_gateway::lifecycle::{
    self, AFTER_SERVER_START, AFTER_SERVER_STOP, BEFORE_SERVER_START, BEFORE_SERVER_STOP,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = AppConfig::from_env()?;
    init_tracing(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

fn init_tracing(config: &AppConfig) {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match config.env_state {
        EnvState::Prod => subscriber.json().init(),
        EnvState::Dev => subscriber.init(),
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.listen_addr();
    tracing::info!(%addr, env = %config.env_state, "starting crawler-gateway");

    // Build the event bus and its startup consumers
    let event_bus = EventBus::new();
    lifecycle::register_error_logger(&event_bus)?;
    lifecycle::register_lifecycle_listeners(&event_bus, config.server_type)?;

    // Build router
    let access_log = config.access_log;
    let state = AppState::new(config, event_bus.clone());
    let mut app = api::build_router(state).layer(CorsLayer::permissive());
    if access_log {
        app = app.layer(TraceLayer::new_for_http());
    }

    // Start server
    lifecycle::emit_phase(&event_bus, BEFORE_SERVER_START, addr)?;
    let listener = TcpListener::bind(addr).await?;
    lifecycle::emit_phase(&event_bus, AFTER_SERVER_START, addr)?;
    tracing::info!(%addr, "server listening");

    let shutdown_bus = event_bus.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "failed to listen for shutdown signal");
            }
            if let Err(err) = lifecycle::emit_phase(&shutdown_bus, BEFORE_SERVER_STOP, addr) {
                tracing::error!(%err, "before_server_stop listener failed");
            }
        })
        .await?;

    lifecycle::emit_phase(&event_bus, AFTER_SERVER_STOP, addr)?;
    Ok(())
}
