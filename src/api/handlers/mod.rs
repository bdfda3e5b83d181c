//! REST endpoint handlers.

pub mod system;
