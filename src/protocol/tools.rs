// MCP method names, the file-process tool descriptor and tool-result decoding

use crate::core::models::{DirectTransferDescriptor, ElicitationDescriptor, ElicitationMode, ToolOutcome};
use crate::protocol::jsonrpc::JsonRpcResponse;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

/// Protocol revision this server speaks (URL-mode elicitation)
pub const PROTOCOL_VERSION: &str = "2025-11-25";

/// The single capability exposed by the capability server
pub const FILE_PROCESS_TOOL: &str = "request_file_process";

pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const ELICITATION_ACCEPT: &str = "elicitation/accept";
    pub const ELICITATION_DECLINE: &str = "elicitation/decline";
}

/// Descriptor returned by `tools/list`
pub fn file_process_tool_descriptor() -> Value {
    json!({
        "name": FILE_PROCESS_TOOL,
        "description": "Initiates a file processing request that requires user to upload a file",
        "inputSchema": {
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Message to display to the user"
                },
                "mode": {
                    "type": "string",
                    "enum": ["ui", "stream"],
                    "description": "Upload mode: 'ui' for browser UI file picker, 'stream' for direct streaming to API"
                }
            },
            "required": ["message", "mode"]
        }
    })
}

/// Caller-facing text for a success payload that does not decode; the parser
/// detail only goes to the log
pub const UNEXPECTED_REPLY: &str = "The file service sent an unexpected reply";

/// One typed block of a tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// `tools/call` success payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Wrap a serializable payload as a single JSON-encoded text block
    pub fn json_text<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            content: vec![ContentBlock {
                kind: "text".to_string(),
                text: Some(serde_json::to_string(payload)?),
            }],
            is_error: false,
        })
    }

    fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.as_deref())
    }
}

/// Decode a `tools/call` response into exactly one outcome
pub fn decode_tool_response(response: JsonRpcResponse) -> ToolOutcome {
    if let Some(error) = response.error {
        if !error.is_deferral() {
            return ToolOutcome::Fault {
                code: Some(error.code),
                message: error.message,
            };
        }
        let descriptor = error
            .data
            .and_then(|data| serde_json::from_value::<ElicitationDescriptor>(data).ok());
        return match descriptor {
            Some(d) if d.mode == ElicitationMode::Url && !d.url.trim().is_empty() => {
                ToolOutcome::Deferred(d)
            }
            Some(d) => ToolOutcome::Fault {
                code: Some(error.code),
                message: format!("Unexpected elicitation payload (mode={:?})", d.mode),
            },
            None => ToolOutcome::Fault {
                code: Some(error.code),
                message: "Elicitation required but no URL was provided".to_string(),
            },
        };
    }

    let Some(result) = response.result else {
        return ToolOutcome::fault("Response carried neither result nor error");
    };

    let call_result: ToolCallResult = match serde_json::from_value(result) {
        Ok(r) => r,
        Err(e) => {
            warn!(component = "MCP_CLIENT", error = %e, "Malformed tool result");
            return ToolOutcome::fault(UNEXPECTED_REPLY);
        }
    };

    let Some(text) = call_result.first_text() else {
        return ToolOutcome::fault("Tool result has no text content");
    };

    if call_result.is_error {
        return ToolOutcome::fault(text.to_string());
    }

    let payload: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!(component = "MCP_CLIENT", error = %e, "Tool result text is not JSON");
            return ToolOutcome::fault(UNEXPECTED_REPLY);
        }
    };

    if payload.get("type").and_then(Value::as_str) != Some("stream_upload") {
        warn!(component = "MCP_CLIENT", kind = ?payload.get("type"), "Tool result is not a stream upload descriptor");
        return ToolOutcome::fault(UNEXPECTED_REPLY);
    }

    match serde_json::from_value::<DirectTransferDescriptor>(payload) {
        Ok(descriptor) => ToolOutcome::Direct(descriptor),
        Err(e) => {
            warn!(component = "MCP_CLIENT", error = %e, "Malformed stream upload descriptor");
            ToolOutcome::fault(UNEXPECTED_REPLY)
        }
    }
}
