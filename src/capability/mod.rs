// Capability server: stateless JSON-RPC dispatcher for the file-process tool
//
// Every call is resolved within its own request/response. The only
// configuration is the transfer endpoint URL that gets handed out.

use crate::core::models::{DirectTransferDescriptor, ElicitationDescriptor, FileProcessArgs, UploadMode};
use crate::core::trace::TraceId;
use crate::flow::{Component, FlowRecorder, FlowStep};
use crate::protocol::jsonrpc::{codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, JSONRPC_VERSION};
use crate::protocol::tools::{file_process_tool_descriptor, methods, ToolCallResult, FILE_PROCESS_TOOL, PROTOCOL_VERSION};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Message used when a `tools/call` leaves `arguments.message` out
pub const DEFAULT_TOOL_MESSAGE: &str = "Please upload a file for processing";

const SERVER_NAME: &str = "elicitation-relay-capability-server";

pub struct CapabilityServer {
    upload_url: String,
    recorder: Arc<FlowRecorder>,
}

impl CapabilityServer {
    pub fn new(upload_url: impl Into<String>) -> Self {
        Self::with_recorder(upload_url, Arc::new(FlowRecorder::new()))
    }

    pub fn with_recorder(upload_url: impl Into<String>, recorder: Arc<FlowRecorder>) -> Self {
        Self {
            upload_url: upload_url.into(),
            recorder,
        }
    }

    pub fn recorder(&self) -> &Arc<FlowRecorder> {
        &self.recorder
    }

    /// Parse a raw body into a request, or into the error response to send back
    pub fn parse_request(body: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| JsonRpcResponse::failure(None, JsonRpcError::parse_error(e)))?;

        // Echo the id whenever it is recoverable, even from a malformed request
        let id = value
            .get("id")
            .and_then(|raw| serde_json::from_value::<RequestId>(raw.clone()).ok());

        let request: JsonRpcRequest = serde_json::from_value(value)
            .map_err(|e| JsonRpcResponse::failure(id.clone(), JsonRpcError::invalid_request(e)))?;

        if request.jsonrpc != JSONRPC_VERSION {
            return Err(JsonRpcResponse::failure(
                id,
                JsonRpcError::invalid_request(format!("unsupported jsonrpc version '{}'", request.jsonrpc)),
            ));
        }

        Ok(request)
    }

    /// Parse and dispatch one body; always yields a response
    pub fn handle_body(&self, body: &[u8], trace: &TraceId) -> JsonRpcResponse {
        match Self::parse_request(body) {
            Ok(request) => self.dispatch(&request, trace),
            Err(response) => {
                warn!(
                    component = "MCP_SERVER",
                    event = "invalid_request",
                    trace_id = %trace,
                    code = response.error.as_ref().map(|e| e.code).unwrap_or(codes::INVALID_REQUEST),
                    "Rejected malformed JSON-RPC body"
                );
                response
            }
        }
    }

    /// Route a request by method name
    pub fn dispatch(&self, request: &JsonRpcRequest, trace: &TraceId) -> JsonRpcResponse {
        let id = request.id.clone();
        let result = match request.method.as_str() {
            methods::INITIALIZE => self.initialize(request, trace),
            methods::TOOLS_LIST => Ok(self.list_tools()),
            methods::TOOLS_CALL => self.call_tool(request, trace),
            methods::ELICITATION_ACCEPT | methods::ELICITATION_DECLINE => {
                info!(
                    component = "MCP_SERVER",
                    event = "elicitation_ack",
                    trace_id = %trace,
                    method = %request.method,
                    "Elicitation acknowledgement received"
                );
                Ok(json!({}))
            }
            other => {
                warn!(component = "MCP_SERVER", trace_id = %trace, method = %other, "Unknown method");
                Err(JsonRpcError::method_not_found(other))
            }
        };
        JsonRpcResponse::from_result(id, result)
    }

    fn initialize(&self, request: &JsonRpcRequest, trace: &TraceId) -> Result<Value, JsonRpcError> {
        let requested = request
            .param("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or("<none>");
        let client = request
            .param("clientInfo")
            .and_then(|info| info.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("<unknown>");

        info!(
            component = "MCP_SERVER",
            direction = "←",
            event = "initialize",
            trace_id = %trace,
            requested_version = %requested,
            client = %client,
            "Initialize request"
        );

        Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            }
        }))
    }

    fn list_tools(&self) -> Value {
        json!({ "tools": [file_process_tool_descriptor()] })
    }

    fn call_tool(&self, request: &JsonRpcRequest, trace: &TraceId) -> Result<Value, JsonRpcError> {
        let started = Instant::now();

        let name = request
            .param("name")
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::invalid_params("missing tool name"))?;

        let mut inbound = FlowStep::new(
            Component::McpClient,
            Component::McpServer,
            trace,
            format!("tools/call {}", name),
        );
        if let Some(ref id) = request.id {
            inbound = inbound.request_id(id);
        }
        self.recorder.record(inbound);

        if name != FILE_PROCESS_TOOL {
            warn!(component = "MCP_SERVER", trace_id = %trace, tool_name = %name, "Unknown tool");
            self.record_reply(request, trace, "Unknown tool", "not_found", started);
            return Err(JsonRpcError::unknown_tool(name));
        }

        let args = match Self::file_process_args(request.param("arguments")) {
            Ok(args) => args,
            Err(e) => {
                self.record_reply(request, trace, "Rejected tool arguments", "invalid_params", started);
                return Err(e);
            }
        };

        info!(
            component = "MCP_SERVER",
            direction = "←",
            event = "tools_call",
            trace_id = %trace,
            request_id = ?request.id,
            tool_name = %name,
            mode = %args.mode,
            "Tool call received"
        );

        match args.mode {
            UploadMode::Interactive => {
                let descriptor = ElicitationDescriptor::url(args.message, self.upload_url.clone());
                let data = to_json(&descriptor)?;
                self.record_reply(
                    request,
                    trace,
                    "URL elicitation required (-32042)",
                    "elicitation_required",
                    started,
                );
                info!(
                    component = "MCP_SERVER",
                    direction = "→",
                    event = "elicitation_required",
                    trace_id = %trace,
                    upload_url_host = %crate::flow::redact_url(&self.upload_url),
                    "Deferring tool call to URL elicitation"
                );
                Err(JsonRpcError::new(codes::URL_ELICITATION_REQUIRED, "URLElicitationRequiredError")
                    .with_data(data))
            }
            UploadMode::Direct => {
                let descriptor = DirectTransferDescriptor::new(args.message, self.upload_url.clone());
                let result = ToolCallResult::json_text(&descriptor)
                    .map_err(|e| JsonRpcError::new(codes::INTERNAL_ERROR, format!("Failed to encode result: {}", e)))?;
                let value = to_json(&result)?;
                self.record_reply(request, trace, "Direct transfer descriptor", "success", started);
                info!(
                    component = "MCP_SERVER",
                    direction = "→",
                    event = "stream_upload",
                    trace_id = %trace,
                    upload_url_host = %crate::flow::redact_url(&self.upload_url),
                    "Returning direct transfer descriptor"
                );
                Ok(value)
            }
        }
    }

    /// Extract `{message, mode}`; the message has a default, the mode does not
    fn file_process_args(arguments: Option<&Value>) -> Result<FileProcessArgs, JsonRpcError> {
        let empty = Value::Object(Default::default());
        let arguments = match arguments {
            None | Some(Value::Null) => &empty,
            Some(value @ Value::Object(_)) => value,
            Some(_) => return Err(JsonRpcError::invalid_params("arguments must be an object")),
        };

        let message = arguments
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_TOOL_MESSAGE)
            .to_string();

        let mode = match arguments.get("mode") {
            None | Some(Value::Null) => {
                return Err(JsonRpcError::invalid_params("missing required argument 'mode'"))
            }
            Some(Value::String(raw)) => UploadMode::from_wire(raw).ok_or_else(|| {
                JsonRpcError::invalid_params(format!("invalid mode '{}': expected 'ui' or 'stream'", raw))
            })?,
            Some(other) => {
                return Err(JsonRpcError::invalid_params(format!(
                    "invalid mode {}: expected 'ui' or 'stream'",
                    other
                )))
            }
        };

        Ok(FileProcessArgs { message, mode })
    }

    fn record_reply(
        &self,
        request: &JsonRpcRequest,
        trace: &TraceId,
        description: &str,
        status: &str,
        started: Instant,
    ) {
        let mut step = FlowStep::new(Component::McpServer, Component::McpClient, trace, description)
            .status(status)
            .duration(started.elapsed());
        if let Some(ref id) = request.id {
            step = step.request_id(id);
        }
        if status == "elicitation_required" || status == "success" {
            step = step.url(&self.upload_url);
        }
        self.recorder.record(step);
    }

    /// Drop this request's steps, emitting them at debug level
    pub fn flush_trace(&self, trace: &TraceId) {
        let summary = self.recorder.finish_turn(trace);
        if !summary.is_empty() {
            debug!(trace_id = %trace, "\n{}", summary);
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(codes::INTERNAL_ERROR, format!("Failed to encode result: {}", e)))
}
