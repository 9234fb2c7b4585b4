// Capability server routes: POST /mcp, GET /health

use axum::{body::Bytes, extract::State, http::HeaderMap, response::IntoResponse, routing::post, Json, Router};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use super::{health_route, with_common_layers};
use crate::capability::CapabilityServer;
use crate::config::{Config, Role};
use crate::core::trace::{TraceId, TRACE_HEADER};

#[derive(Clone)]
pub struct CapabilityState {
    pub server: Arc<CapabilityServer>,
    pub config: Arc<Config>,
}

impl CapabilityState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            server: Arc::new(CapabilityServer::new(config.transfer_endpoint_url.clone())),
            config: Arc::new(config.clone()),
        }
    }
}

pub fn router(state: CapabilityState) -> Router {
    let config = state.config.clone();
    let router = Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/health", health_route(Role::CapabilityServer))
        .layer(RequestBodyLimitLayer::new(config.body_size_limit_bytes))
        .with_state(state);
    with_common_layers(router, &config)
}

/// JSON-RPC endpoint
///
/// POST /mcp
///
/// Always answers HTTP 200 with a JSON-RPC envelope; malformed bodies get
/// -32700 / -32600 instead of an HTTP error.
pub async fn mcp_handler(
    State(state): State<CapabilityState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let trace = TraceId::from_headers_or_generate(&headers);
    let response = state.server.handle_body(&body, &trace);
    state.server.flush_trace(&trace);
    ([(TRACE_HEADER, trace.to_string())], Json(response))
}
