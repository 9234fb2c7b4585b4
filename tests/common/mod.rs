// Common test utilities and helpers for all test modules
#![allow(dead_code)]

use axum::body::Body;
use axum::http::Response;
use elicitation_relay::core::errors::RelayError;
use elicitation_relay::core::models::{FileProcessArgs, ToolOutcome};
use elicitation_relay::core::trace::TraceId;
use elicitation_relay::requester::{CapabilityClient, Decision, ProposedToolCall, ToolDecider};
use elicitation_relay::transfer::BlobStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

pub const UPLOAD_URL: &str = "http://endpoint/upload";

pub fn trace(raw: &str) -> TraceId {
    TraceId::parse(raw).expect("valid trace token")
}

/// Decider returning a fixed decision, or failing
pub struct ScriptedDecider {
    pub decision: Option<Decision>,
}

impl ScriptedDecider {
    /// Propose the file-process tool with the given suggested mode
    pub fn proposing(mode: Option<&str>) -> Self {
        Self {
            decision: Some(Decision {
                reply_text: String::new(),
                tool_call: Some(ProposedToolCall {
                    name: "request_file_process".to_string(),
                    message: Some("Please upload your document".to_string()),
                    mode: mode.map(str::to_string),
                }),
            }),
        }
    }

    pub fn failing() -> Self {
        Self { decision: None }
    }
}

#[async_trait::async_trait]
impl ToolDecider for ScriptedDecider {
    async fn decide(&self, _message: &str, _has_attached_file: bool) -> Result<Decision, RelayError> {
        self.decision
            .clone()
            .ok_or_else(|| RelayError::Decider("model backend returned 503".to_string()))
    }
}

/// One call observed by [`StubCapabilityClient`]
#[derive(Debug, Clone)]
pub struct ObservedCall {
    pub name: String,
    pub args: FileProcessArgs,
    pub trace: TraceId,
}

/// Capability client answering with a canned outcome and recording every call
pub struct StubCapabilityClient {
    outcome: Mutex<Option<Result<ToolOutcome, RelayError>>>,
    pub calls: Mutex<Vec<ObservedCall>>,
}

impl StubCapabilityClient {
    pub fn returning(outcome: ToolOutcome) -> Self {
        Self {
            outcome: Mutex::new(Some(Ok(outcome))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: RelayError) -> Self {
        Self {
            outcome: Mutex::new(Some(Err(err))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ObservedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CapabilityClient for StubCapabilityClient {
    async fn call_tool(
        &self,
        name: &str,
        args: &FileProcessArgs,
        trace: &TraceId,
    ) -> Result<ToolOutcome, RelayError> {
        self.calls.lock().unwrap().push(ObservedCall {
            name: name.to_string(),
            args: args.clone(),
            trace: trace.clone(),
        });
        self.outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(RelayError::Transport("stub already used".to_string())))
    }
}

/// In-memory blob store
#[derive(Default)]
pub struct MemoryBlobStore {
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, file_id: &str, bytes: &[u8]) -> Result<(), RelayError> {
        self.blobs.lock().unwrap().insert(file_id.to_string(), bytes.to_vec());
        Ok(())
    }
}

pub const BOUNDARY: &str = "relay-test-boundary";

/// Build a multipart/form-data body with a single file field
pub fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Collect a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
