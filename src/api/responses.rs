// Response types for API endpoints

use crate::config::Role;
use crate::core::errors::RelayError;
use crate::core::trace::{TraceId, TRACE_HEADER};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

impl HealthResponse {
    pub fn ok(role: Role) -> Self {
        Self {
            status: "ok".to_string(),
            service: role.service_name().to_string(),
        }
    }
}

/// API error type that converts domain errors to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub trace_id: Option<TraceId>,
}

impl ApiError {
    /// Create from RelayError; the body only ever carries the sanitized message
    pub fn from_relay_error(err: RelayError) -> Self {
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            message: err.user_message(),
            trace_id: None,
        }
    }

    /// Create from RelayError with the turn's trace token
    pub fn from_relay_error_with_trace(err: RelayError, trace_id: TraceId) -> Self {
        Self {
            trace_id: Some(trace_id),
            ..Self::from_relay_error(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            trace_id: self.trace_id.as_ref().map(|t| t.to_string()),
        });
        match self.trace_id {
            Some(trace) => (self.status, [(TRACE_HEADER, trace.to_string())], body).into_response(),
            None => (self.status, body).into_response(),
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        ApiError::from_relay_error(err)
    }
}
