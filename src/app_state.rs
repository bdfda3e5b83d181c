//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::EventBus;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// In-process event bus; the error interceptor reports through it.
    pub event_bus: EventBus,
}

impl AppState {
    /// Creates the state from its parts.
    #[must_use]
    pub fn new(config: AppConfig, event_bus: EventBus) -> Self {
        Self {
            config: Arc::new(config),
            event_bus,
        }
    }
}
