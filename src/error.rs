//! Error types and HTTP status code mapping.
//!
//! [`AppError`] is the error type returned by HTTP handlers. Domain
//! failures carry a closed [`DomainErrorKind`], and a single table,
//! [`DomainErrorKind::status_code`], decides the HTTP status.
//! [`EventBusError`] covers the failures the event bus can report.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::ListenerId;

/// Failures reported by [`crate::domain::EventBus`].
///
/// Removing a listener or event that does not exist is never an error.
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    /// `"error"` was emitted with no handler registered. Carries the first
    /// positional argument when it was present and not `null`.
    #[error("{}", unhandled_message(.0.as_ref()))]
    UnhandledErrorEvent(Option<Value>),

    /// A handler failed during emission. Remaining handlers were skipped.
    #[error("handler for '{event}' failed: {source}")]
    HandlerFailure {
        /// Event being emitted.
        event: String,
        /// Error returned by the handler.
        #[source]
        source: anyhow::Error,
    },

    /// The listener is already registered for this event in the other
    /// mode (`on` versus `once`).
    #[error("listener {id} is already registered for '{event}' in another mode")]
    DualRegistration {
        /// Event the registration targeted.
        event: String,
        /// Identity of the listener.
        id: ListenerId,
    },
}

fn unhandled_message(error: Option<&Value>) -> String {
    match error {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => "Uncaught, unspecified 'error' event.".to_string(),
    }
}

/// Closed set of domain failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainErrorKind {
    /// A domain rule rejected the operation.
    Domain,
    /// The requested entity does not exist.
    NotFound,
    /// The operation conflicts with existing state.
    Conflict,
}

impl DomainErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Domain => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
        }
    }

    /// Returns the stable name used in serialized errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
        }
    }
}

/// Serialized error, used as the JSON error body and as the payload of
/// `"error"` events.
///
/// ```json
/// { "name": "conflict", "message": "keyspace already exists" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerializedError {
    /// Error category name.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Structured JSON error response body: `{ "error": { ... } }`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Serialized error payload.
    pub error: SerializedError,
}

/// Error returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A categorized domain failure.
    #[error("{message}")]
    Domain {
        /// Failure category.
        kind: DomainErrorKind,
        /// Human-readable message.
        message: String,
        /// Optional structured context.
        metadata: Option<Map<String, Value>>,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a domain error without metadata.
    pub fn domain(kind: DomainErrorKind, message: impl Into<String>) -> Self {
        Self::Domain {
            kind,
            message: message.into(),
            metadata: None,
        }
    }

    /// Attaches a metadata entry. Has no effect on [`AppError::Internal`].
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Self::Domain { metadata, .. } = &mut self {
            metadata
                .get_or_insert_with(Map::new)
                .insert(key.into(), value.into());
        }
        self
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Domain { kind, .. } => kind.status_code(),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the serialized form of this error.
    #[must_use]
    pub fn to_serialized(&self) -> SerializedError {
        match self {
            Self::Domain {
                kind,
                message,
                metadata,
            } => SerializedError {
                name: kind.as_str().to_string(),
                message: message.clone(),
                metadata: metadata.clone(),
            },
            Self::Internal(message) => SerializedError {
                name: "internal".to_string(),
                message: message.clone(),
                metadata: None,
            },
        }
    }
}

impl From<EventBusError> for AppError {
    fn from(err: EventBusError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let serialized = self.to_serialized();
        let mut response = axum::Json(ErrorResponse {
            error: serialized.clone(),
        })
        .into_response();
        *response.status_mut() = status;
        // Picked up by the error interceptor layer.
        response.extensions_mut().insert(serialized);
        response
    }
}
