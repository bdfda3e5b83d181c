//! HTTP layer: route handlers, error interception and router composition.

pub mod handlers;
pub mod interceptor;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for the HTTP surface.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(handlers::system::health_handler),
    components(schemas(handlers::system::HealthResponse)),
    tags((name = "System", description = "Service status"))
)]
pub struct ApiDoc;

/// Builds the complete router. The error interceptor wraps every route.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new().merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            interceptor::intercept_errors,
        ))
        .with_state(state)
}
