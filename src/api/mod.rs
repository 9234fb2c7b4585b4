// Axum web server layer: one router per role, shared middleware

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    routing::{get, MethodRouter},
    BoxError, Json, Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod capability;
pub mod requester;
pub mod responses;
pub mod transfer;

use crate::config::{Config, Role};
use responses::HealthResponse;

pub use capability::CapabilityState;
pub use requester::RequesterState;
pub use transfer::TransferState;

/// `GET /health` for any role
pub(crate) fn health_route<S>(role: Role) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    get(move || async move { Json(HealthResponse::ok(role)) })
}

/// Wrap a role router in the middleware every role shares
///
/// Middleware stack (outermost to innermost):
/// - Tracing (tower-http::trace)
/// - CORS, permissive: the UI is served from another origin
/// - Request timeout (tower::timeout), answered with 408
///
/// Body size limits are applied by each role router, since `/upload` takes none.
pub fn with_common_layers(router: Router, config: &Config) -> Router {
    with_shared_layers(with_request_timeout(router, config))
}

/// Bound every route of `router` by `REQUEST_TIMEOUT_SECS`
pub(crate) fn with_request_timeout(router: Router, config: &Config) -> Router {
    let timeout_secs = config.request_timeout_secs;

    // HandleErrorLayer must come before timeout to catch the timeout error
    let middleware_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            let status = if e.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        }))
        .timeout(Duration::from_secs(timeout_secs))
        .into_inner();

    router.layer(middleware_stack)
}

/// Tracing and CORS, applied to every route including untimed ones
pub(crate) fn with_shared_layers(router: Router) -> Router {
    router.layer(CorsLayer::permissive()).layer(TraceLayer::new_for_http())
}

/// Build the router for whichever role `config` describes
pub async fn create_router(config: &Config) -> Result<Router, crate::core::errors::RelayError> {
    let router = match config.role {
        Role::CapabilityServer => capability::router(CapabilityState::from_config(config)),
        Role::Requester => requester::router(RequesterState::from_config(config)?),
        Role::Transfer => transfer::router(TransferState::from_config(config).await?),
    };
    Ok(router)
}
