// Tool-invocation decision: whether a chat turn should call the file-process tool

use crate::core::errors::RelayError;
use crate::core::models::UploadMode;
use crate::protocol::tools::FILE_PROCESS_TOOL;
use async_trait::async_trait;

/// A tool call the decider wants made; `mode` is only a suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedToolCall {
    pub name: String,
    pub message: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Text for the user; may be empty when a tool call is proposed
    pub reply_text: String,
    pub tool_call: Option<ProposedToolCall>,
}

impl Decision {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply_text: text.into(),
            tool_call: None,
        }
    }
}

/// Decides what to do with one chat turn
///
/// Language-model backed implementations plug in here; the requester only
/// relies on this contract.
#[async_trait]
pub trait ToolDecider: Send + Sync {
    async fn decide(&self, message: &str, has_attached_file: bool) -> Result<Decision, RelayError>;
}

const KEYWORDS: [&str; 3] = ["file", "process", "upload"];

pub const HELP_TEXT: &str = "Hello! Say 'process file' or 'upload file' to start a file upload.";

/// Deterministic decider: proposes the tool when a file is attached or the
/// message mentions a file, processing or an upload
#[derive(Debug, Default, Clone)]
pub struct KeywordDecider;

impl KeywordDecider {
    pub fn new() -> Self {
        Self
    }

    fn wants_upload(message: &str) -> bool {
        let lower = message.to_lowercase();
        KEYWORDS.iter().any(|k| lower.contains(k))
    }
}

#[async_trait]
impl ToolDecider for KeywordDecider {
    async fn decide(&self, message: &str, has_attached_file: bool) -> Result<Decision, RelayError> {
        if !has_attached_file && !Self::wants_upload(message) {
            return Ok(Decision::reply(HELP_TEXT));
        }

        Ok(Decision {
            reply_text: String::new(),
            tool_call: Some(ProposedToolCall {
                name: FILE_PROCESS_TOOL.to_string(),
                message: None,
                mode: Some(UploadMode::for_attachment(has_attached_file).as_wire().to_string()),
            }),
        })
    }
}
