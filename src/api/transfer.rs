// Transfer endpoint routes: POST /upload (multipart), GET /health

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::responses::ApiError;
use super::{health_route, with_request_timeout, with_shared_layers};
use crate::config::{Config, Role};
use crate::core::errors::RelayError;
use crate::core::models::UploadReceipt;
use crate::core::trace::{TraceId, TRACE_HEADER};
use crate::flow::{Component, FlowRecorder, FlowStep};
use crate::transfer::{new_file_id, BlobStore, FsBlobStore};

/// Multipart field carrying the payload
pub const FILE_FIELD: &str = "file";

#[derive(Clone)]
pub struct TransferState {
    pub store: Arc<dyn BlobStore>,
    pub recorder: Arc<FlowRecorder>,
    pub config: Arc<Config>,
}

impl TransferState {
    pub async fn from_config(config: &Config) -> Result<Self, RelayError> {
        let store = FsBlobStore::open(config.upload_dir.clone()).await?;
        info!(upload_dir = %store.root().display(), "Upload directory ready");
        Ok(Self::new(Arc::new(store), config))
    }

    pub fn new(store: Arc<dyn BlobStore>, config: &Config) -> Self {
        Self {
            store,
            recorder: Arc::new(FlowRecorder::new()),
            config: Arc::new(config.clone()),
        }
    }
}

/// `/upload` is neither size- nor time-bounded; `/health` gets the usual timeout
pub fn router(state: TransferState) -> Router {
    let config = state.config.clone();
    let upload = Router::new()
        .route("/upload", post(upload_handler).layer(DefaultBodyLimit::disable()))
        .with_state(state);
    let health = with_request_timeout(Router::new().route("/health", health_route(Role::Transfer)), &config);
    with_shared_layers(upload.merge(health))
}

/// Accept one file and persist it under a fresh id
///
/// POST /upload
pub async fn upload_handler(
    State(state): State<TransferState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let trace = TraceId::from_headers_or_generate(&headers);
    let reject = |e: RelayError| ApiError::from_relay_error_with_trace(e, trace.clone());

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(RelayError::InvalidInput(format!("malformed multipart body: {}", e))))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("unnamed").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| reject(RelayError::InvalidInput(format!("failed to read file field: {}", e))))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| reject(RelayError::InvalidInput("multipart field 'file' is required".to_string())))?;

    let file_id = new_file_id();
    state.store.put(&file_id, &bytes).await.map_err(|e| {
        error!(trace_id = %trace, file_id = %file_id, error = %e, "Failed to persist upload");
        reject(e)
    })?;

    info!(
        component = "FILE_API",
        direction = "←",
        event = "file_uploaded",
        trace_id = %trace,
        file_id = %file_id,
        filename = %filename,
        size = bytes.len(),
        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
        "File uploaded"
    );

    state.recorder.record(
        FlowStep::new(Component::Ui, Component::FileApi, &trace, format!("Upload of '{}'", filename))
            .file_id(file_id.clone())
            .status("success")
            .duration(started.elapsed()),
    );
    let summary = state.recorder.finish_turn(&trace);
    debug!(trace_id = %trace, "\n{}", summary);

    let receipt = UploadReceipt {
        status: "success".to_string(),
        file_id,
    };
    Ok(([(TRACE_HEADER, trace.to_string())], Json(receipt)))
}
