//! Error interceptor middleware.
//!
//! Handlers return [`crate::error::AppError`], which attaches its
//! [`SerializedError`] to the response extensions. This layer reads it
//! back: server-side failures are reported on the event bus's reserved
//! `"error"` event, client-side failures are only logged.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::app_state::AppState;
use crate::domain::{ERROR_EVENT, EventArgs};
use crate::error::SerializedError;

/// Reports failed responses. Never alters the response.
pub async fn intercept_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let Some(error) = response.extensions().get::<SerializedError>().cloned() else {
        return response;
    };
    let status = response.status();

    if status.is_server_error() {
        let payload = serde_json::to_value(&error).unwrap_or_default();
        let args = EventArgs::new()
            .arg(payload)
            .kwarg("method", method.as_str())
            .kwarg("path", path.as_str())
            .kwarg("status", status.as_u16());
        if let Err(err) = state.event_bus.emit(ERROR_EVENT, &args) {
            tracing::warn!(%err, %method, %path, "error event not handled");
        }
    } else {
        tracing::debug!(
            %method,
            %path,
            status = status.as_u16(),
            name = %error.name,
            message = %error.message,
            "request rejected"
        );
    }

    response
}
