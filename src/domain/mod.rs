//! Domain layer: the in-process event bus and its handler types.
//!
//! The bus is self-contained; nothing here depends on the HTTP layer or
//! on configuration.

pub mod event_args;
pub mod event_bus;
pub mod listener;

pub use event_args::EventArgs;
pub use event_bus::{ERROR_EVENT, EventBus, NEW_LISTENER_EVENT, Registration};
pub use listener::{Listener, ListenerId};
