//! # crawler-gateway
//!
//! HTTP service skeleton for the crawler backend, built around an
//! in-process event bus.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── Router + error interceptor (api/)
//!     │
//!     ├── EventBus (domain/) ◄── lifecycle listeners (lifecycle)
//!     │
//!     └── AppConfig (config), threaded through AppState
//! ```
//!
//! The [`domain::EventBus`] is a synchronous, ordered, multi-consumer
//! publish/subscribe primitive with one-shot listeners and a reserved
//! `"error"` event that fails loudly when nobody listens.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod lifecycle;
