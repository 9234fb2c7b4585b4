// HTTP client for the capability server (JSON-RPC 2.0 over POST)

use crate::core::errors::RelayError;
use crate::core::models::{FileProcessArgs, ToolOutcome};
use crate::core::trace::{TraceId, TRACE_HEADER};
use crate::flow::redact_url;
use crate::protocol::jsonrpc::{JsonRpcRequest, JsonRpcResponse, RequestId, JSONRPC_VERSION};
use crate::protocol::tools::{decode_tool_response, methods, PROTOCOL_VERSION};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Network seam between the orchestrator and the capability server
#[async_trait]
pub trait CapabilityClient: Send + Sync {
    /// Invoke a tool and decode the reply. `Err` means the call itself failed
    /// (transport, timeout, undecodable envelope); protocol-level errors come
    /// back as `Ok(ToolOutcome::Fault { .. })`.
    async fn call_tool(
        &self,
        name: &str,
        args: &FileProcessArgs,
        trace: &TraceId,
    ) -> Result<ToolOutcome, RelayError>;
}

/// Speaks to the capability server over HTTP with connection pooling
pub struct HttpCapabilityClient {
    http_client: Client,
    server_url: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl HttpCapabilityClient {
    /// Create a client with a bounded per-hop timeout
    pub fn new(server_url: impl Into<String>, timeout_secs: u64) -> Result<Self, RelayError> {
        let timeout = Duration::from_secs(timeout_secs);
        let connect_timeout = Duration::from_secs(2).min(timeout);

        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| RelayError::ConfigurationError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            server_url: server_url.into(),
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed) as i64)
    }

    /// POST one JSON-RPC request and validate the envelope
    async fn post(&self, request: &JsonRpcRequest, trace: &TraceId) -> Result<JsonRpcResponse, RelayError> {
        let started = Instant::now();

        debug!(
            component = "MCP_CLIENT",
            direction = "→",
            event = "jsonrpc_request",
            trace_id = %trace,
            method = %request.method,
            request_id = ?request.id,
            url = %redact_url(&self.server_url),
            "Sending JSON-RPC request"
        );

        let response = self
            .http_client
            .post(&self.server_url)
            .header(TRACE_HEADER, trace.as_str())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(trace_id = %trace, method = %request.method, error = %e, "Capability server request failed");
                RelayError::from_reqwest(e, self.timeout.as_secs())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                trace_id = %trace,
                status_code = status.as_u16(),
                error = %error_text,
                "Capability server returned HTTP error"
            );
            return Err(RelayError::Protocol(format!("Capability server error: HTTP {}", status)));
        }

        let body: JsonRpcResponse = response.json().await.map_err(|e| {
            error!(trace_id = %trace, error = %e, "Failed to parse JSON-RPC response");
            RelayError::from_reqwest(e, self.timeout.as_secs())
        })?;

        if body.jsonrpc != JSONRPC_VERSION {
            error!(trace_id = %trace, jsonrpc = %body.jsonrpc, "Invalid JSON-RPC version");
            return Err(RelayError::Protocol(format!("Invalid JSON-RPC version: {}", body.jsonrpc)));
        }

        if body.id != request.id {
            error!(
                trace_id = %trace,
                request_id = ?request.id,
                response_id = ?body.id,
                "JSON-RPC response id does not match request"
            );
            return Err(RelayError::Protocol("JSON-RPC response id does not match request".to_string()));
        }

        debug!(
            component = "MCP_CLIENT",
            direction = "←",
            event = "jsonrpc_response",
            trace_id = %trace,
            request_id = ?body.id,
            status_code = status.as_u16(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Received JSON-RPC response"
        );

        Ok(body)
    }

    /// Stateless `initialize` ceremony; only failure matters
    async fn initialize(&self, trace: &TraceId) -> Result<(), RelayError> {
        let request = JsonRpcRequest::new(self.next_request_id(), methods::INITIALIZE).with_params(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "elicitation": { "url": {}, "form": {} } },
            "clientInfo": {
                "name": "elicitation-relay-requester",
                "version": env!("CARGO_PKG_VERSION"),
            }
        }));

        let response = self.post(&request, trace).await?;
        if let Some(err) = response.error {
            return Err(RelayError::Protocol(format!(
                "initialize failed ({}): {}",
                err.code, err.message
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CapabilityClient for HttpCapabilityClient {
    async fn call_tool(
        &self,
        name: &str,
        args: &FileProcessArgs,
        trace: &TraceId,
    ) -> Result<ToolOutcome, RelayError> {
        self.initialize(trace).await?;

        let request_id = self.next_request_id();
        let request = JsonRpcRequest::new(request_id.clone(), methods::TOOLS_CALL).with_params(json!({
            "name": name,
            "arguments": args,
        }));

        info!(
            component = "MCP_CLIENT",
            direction = "→",
            event = "tools_call",
            trace_id = %trace,
            request_id = %request_id,
            tool_name = %name,
            mode = %args.mode,
            "Calling capability"
        );

        let response = self.post(&request, trace).await?;
        Ok(decode_tool_response(response))
    }
}
