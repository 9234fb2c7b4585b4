// Requester routes: POST /chat, POST /elicitation/complete, GET /health

use axum::{extract::State, http::HeaderMap, response::IntoResponse, routing::post, Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

use super::responses::ApiError;
use super::{health_route, with_common_layers};
use crate::config::{Config, Role};
use crate::core::errors::RelayError;
use crate::core::models::{ChatRequest, CompletionNotification};
use crate::core::trace::{TraceId, TRACE_HEADER};
use crate::flow::FlowRecorder;
use crate::requester::{HttpCapabilityClient, KeywordDecider, Requester};

#[derive(Clone)]
pub struct RequesterState {
    pub requester: Arc<Requester>,
    pub config: Arc<Config>,
}

impl RequesterState {
    /// Wire the keyword decider and the HTTP capability client
    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        let client = HttpCapabilityClient::new(config.capability_server_url.clone(), config.hop_timeout_secs)?;
        let requester = Requester::new(
            Arc::new(KeywordDecider::new()),
            Arc::new(client),
            Arc::new(FlowRecorder::new()),
        );
        Ok(Self {
            requester: Arc::new(requester),
            config: Arc::new(config.clone()),
        })
    }
}

pub fn router(state: RequesterState) -> Router {
    let config = state.config.clone();
    let router = Router::new()
        .route("/chat", post(chat_handler))
        .route("/elicitation/complete", post(complete_handler))
        .route("/health", health_route(Role::Requester))
        .layer(RequestBodyLimitLayer::new(config.body_size_limit_bytes))
        .with_state(state);
    with_common_layers(router, &config)
}

/// One chat turn
///
/// POST /chat
pub async fn chat_handler(
    State(state): State<RequesterState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let trace = TraceId::from_headers_or_generate(&headers);

    info!(
        component = "REQUESTER",
        direction = "←",
        event = "chat_request",
        trace_id = %trace,
        has_attached_file = request.has_attached_file,
        "Received chat message"
    );

    let reply = state.requester.handle_turn(request, trace.clone()).await;
    ([(TRACE_HEADER, trace.to_string())], Json(reply))
}

/// Completion notification from the caller once bytes reached the transfer endpoint
///
/// POST /elicitation/complete
pub async fn complete_handler(
    State(state): State<RequesterState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let trace = TraceId::from_headers_or_generate(&headers);
    let notification = CompletionNotification::from_value(body)
        .map_err(|e| ApiError::from_relay_error_with_trace(e, trace.clone()))?;

    let ack = state.requester.complete(&notification, &trace);
    Ok(([(TRACE_HEADER, trace.to_string())], Json(ack)))
}
