// Domain models for the file-elicitation flow
//
// Pure data: the payloads exchanged between requester, capability server and
// transfer endpoint, plus the typed outcome a tool call decodes into.

use crate::core::errors::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Generic prompt used whenever a peer leaves the upload message out
pub const DEFAULT_UPLOAD_PROMPT: &str = "Please select a file to upload for processing";

/// How the file is going to reach the transfer endpoint.
///
/// Spelled `"ui"` / `"stream"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadMode {
    /// No bytes at hand: the user must be sent to a URL first
    #[serde(rename = "ui")]
    Interactive,
    /// Bytes already at hand: stream them straight to the endpoint
    #[serde(rename = "stream")]
    Direct,
}

impl UploadMode {
    pub fn as_wire(&self) -> &'static str {
        match self {
            UploadMode::Interactive => "ui",
            UploadMode::Direct => "stream",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "ui" => Some(UploadMode::Interactive),
            "stream" => Some(UploadMode::Direct),
            _ => None,
        }
    }

    /// The only mode consistent with whether the caller already holds the file
    pub fn for_attachment(has_attached_file: bool) -> Self {
        if has_attached_file {
            UploadMode::Direct
        } else {
            UploadMode::Interactive
        }
    }
}

impl FromStr for UploadMode {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UploadMode::from_wire(s).ok_or_else(|| {
            RelayError::InvalidInput(format!("Invalid mode '{}': expected 'ui' or 'stream'", s))
        })
    }
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Arguments of the `request_file_process` capability call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProcessArgs {
    pub message: String,
    pub mode: UploadMode,
}

/// Elicitation modes defined by the protocol; only `url` is served here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElicitationMode {
    Url,
    Form,
}

/// `data` payload of the deferral error: "send the user to `url`"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElicitationDescriptor {
    pub mode: ElicitationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub url: String,
}

impl ElicitationDescriptor {
    pub fn url(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            mode: ElicitationMode::Url,
            message: Some(message.into()),
            url: url.into(),
        }
    }
}

/// How to reach the transfer endpoint directly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMetadata {
    pub description: String,
    pub method: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
}

/// Successful result of a `direct` capability call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "stream_upload")]
pub struct DirectTransferDescriptor {
    pub mode: UploadMode,
    pub message: String,
    pub url: String,
    pub metadata: TransferMetadata,
}

impl DirectTransferDescriptor {
    pub fn new(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            mode: UploadMode::Direct,
            message: message.into(),
            url: url.into(),
            metadata: TransferMetadata {
                description: "Direct file upload endpoint".to_string(),
                method: "POST".to_string(),
                content_type: "multipart/form-data".to_string(),
            },
        }
    }
}

/// A tool-call response, decoded once at the protocol boundary
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Cannot complete synchronously; the user has to visit a URL
    Deferred(ElicitationDescriptor),
    /// Completed; the caller is told where to stream the bytes
    Direct(DirectTransferDescriptor),
    /// Anything else
    Fault { code: Option<i32>, message: String },
}

impl ToolOutcome {
    pub fn fault(message: impl Into<String>) -> Self {
        ToolOutcome::Fault {
            code: None,
            message: message.into(),
        }
    }
}

/// Inbound chat turn from the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub has_attached_file: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    Interactive,
}

/// Deferred-interactive outcome surfaced to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractivePrompt {
    pub mode: PromptMode,
    pub message: String,
    pub url: String,
}

/// What the UI has to do next, if anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Elicitation {
    Interactive(InteractivePrompt),
    Direct(DirectTransferDescriptor),
}

/// Reply to one chat turn; `response` is always a short natural-language line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub elicitation: Option<Elicitation>,
}

impl ChatReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            elicitation: None,
        }
    }
}

/// Notification that the transfer endpoint accepted the bytes
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionNotification {
    pub file_id: String,
    pub extra: Map<String, Value>,
}

impl CompletionNotification {
    /// Accept any JSON object carrying a non-empty string `file_id`
    pub fn from_value(value: Value) -> Result<Self, RelayError> {
        let Value::Object(mut map) = value else {
            return Err(RelayError::InvalidInput("expected a JSON object".to_string()));
        };
        let file_id = match map.remove("file_id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            _ => return Err(RelayError::InvalidInput("file_id is required".to_string())),
        };
        Ok(Self { file_id, extra: map })
    }
}

/// Acknowledgement of a completion notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionAck {
    pub status: String,
    pub message: String,
}

/// Transfer endpoint reply to an accepted upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub status: String,
    pub file_id: String,
}
