//! Server lifecycle events.
//!
//! `main` emits one event per phase on the [`EventBus`]; the listeners
//! registered here only log. Which phases are observed depends on the
//! [`ServerType`].

use crate::config::ServerType;
use crate::domain::{EventArgs, EventBus, Listener};
use crate::error::EventBusError;

/// Emitted before the listener socket is bound.
pub const BEFORE_SERVER_START: &str = "before_server_start";
/// Emitted once the server accepts connections.
pub const AFTER_SERVER_START: &str = "after_server_start";
/// Emitted when shutdown has been requested.
pub const BEFORE_SERVER_STOP: &str = "before_server_stop";
/// Emitted after the server has drained and stopped.
pub const AFTER_SERVER_STOP: &str = "after_server_stop";

/// Lifecycle phases observed for a hosting mode, in the order they occur.
#[must_use]
pub const fn phases(server_type: ServerType) -> &'static [&'static str] {
    match server_type {
        ServerType::BuiltIn => &[
            BEFORE_SERVER_START,
            AFTER_SERVER_START,
            BEFORE_SERVER_STOP,
            AFTER_SERVER_STOP,
        ],
        ServerType::External => &[AFTER_SERVER_START, BEFORE_SERVER_STOP],
    }
}

fn phase_logger(phase: &'static str) -> Listener {
    Listener::infallible(move |args| {
        let addr = args.named("addr").and_then(|v| v.as_str()).unwrap_or("-");
        tracing::info!(phase, addr, "server lifecycle");
    })
}

/// Registers one logging listener per observed phase and returns them.
///
/// # Errors
///
/// Returns an [`EventBusError`] if a registration is rejected.
pub fn register_lifecycle_listeners(
    bus: &EventBus,
    server_type: ServerType,
) -> Result<Vec<Listener>, EventBusError> {
    phases(server_type)
        .iter()
        .map(|&phase| bus.on(phase, phase_logger(phase)))
        .collect()
}

/// Emits a lifecycle phase with the bound address as the `addr` argument.
///
/// # Errors
///
/// Returns an [`EventBusError`] if a listener fails.
pub fn emit_phase(
    bus: &EventBus,
    phase: &str,
    addr: std::net::SocketAddr,
) -> Result<bool, EventBusError> {
    bus.emit(phase, &EventArgs::new().kwarg("addr", addr.to_string()))
}

/// Registers a listener on the reserved `"error"` event that logs every
/// reported error, so that failures funneled through the bus never turn
/// into unhandled-error faults.
///
/// # Errors
///
/// Returns an [`EventBusError`] if the registration is rejected.
pub fn register_error_logger(bus: &EventBus) -> Result<Listener, EventBusError> {
    bus.on(
        crate::domain::ERROR_EVENT,
        Listener::infallible(|args| {
            let error = args.first().map(ToString::to_string).unwrap_or_default();
            tracing::error!(%error, "error reported on event bus");
        }),
    )
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::ERROR_EVENT;

    fn addr() -> std::net::SocketAddr {
        std::net::SocketAddr::from(([127, 0, 0, 1], 8000))
    }

    #[test]
    fn built_in_observes_all_phases() {
        let bus = EventBus::new();
        let Ok(listeners) = register_lifecycle_listeners(&bus, ServerType::BuiltIn) else {
            panic!("registration failed");
        };
        assert_eq!(listeners.len(), 4);
        for phase in phases(ServerType::BuiltIn) {
            assert_eq!(bus.listeners(phase).len(), 1);
            assert!(matches!(emit_phase(&bus, phase, addr()), Ok(true)));
        }
    }

    #[test]
    fn external_observes_inner_phases_only() {
        let bus = EventBus::new();
        let Ok(_) = register_lifecycle_listeners(&bus, ServerType::External) else {
            panic!("registration failed");
        };
        assert!(bus.listeners(BEFORE_SERVER_START).is_empty());
        assert!(bus.listeners(AFTER_SERVER_STOP).is_empty());
        assert_eq!(bus.listeners(AFTER_SERVER_START).len(), 1);
        assert_eq!(bus.listeners(BEFORE_SERVER_STOP).len(), 1);
        assert!(matches!(emit_phase(&bus, BEFORE_SERVER_START, addr()), Ok(false)));
    }

    #[test]
    fn registering_twice_is_idempotent_per_listener_only() {
        let bus = EventBus::new();
        let _ = register_lifecycle_listeners(&bus, ServerType::External);
        let _ = register_lifecycle_listeners(&bus, ServerType::External);
        // Fresh listeners each call, so both sets are kept.
        assert_eq!(bus.listeners(AFTER_SERVER_START).len(), 2);
    }

    #[test]
    fn error_logger_handles_error_event() {
        let bus = EventBus::new();
        assert!(bus.emit(ERROR_EVENT, &EventArgs::new()).is_err());
        let Ok(_) = register_error_logger(&bus) else {
            panic!("registration failed");
        };
        assert!(matches!(
            bus.emit(ERROR_EVENT, &EventArgs::new().arg("boom")),
            Ok(true)
        ));
    }
}
