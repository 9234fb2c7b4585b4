// Hop-by-hop flow recording, keyed by trace token

pub mod recorder;

pub use recorder::{FlowRecorder, FlowSummary};

use crate::core::trace::TraceId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Parties that appear as sender or receiver of a hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Component {
    Ui,
    Requester,
    Decider,
    McpClient,
    McpServer,
    FileApi,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Ui => "UI",
            Component::Requester => "REQUESTER",
            Component::Decider => "DECIDER",
            Component::McpClient => "MCP_CLIENT",
            Component::McpServer => "MCP_SERVER",
            Component::FileApi => "FILE_API",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded hop
#[derive(Debug, Clone, Serialize)]
pub struct FlowStep {
    pub sender: Component,
    pub receiver: Component,
    pub description: String,
    pub trace_id: TraceId,
    pub request_id: Option<String>,
    pub file_id: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub duration_ms: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl FlowStep {
    pub fn new(
        sender: Component,
        receiver: Component,
        trace_id: &TraceId,
        description: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            receiver,
            description: description.into(),
            trace_id: trace_id.clone(),
            request_id: None,
            file_id: None,
            url: None,
            status: None,
            duration_ms: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn request_id(mut self, id: impl fmt::Display) -> Self {
        self.request_id = Some(id.to_string());
        self
    }

    pub fn file_id(mut self, id: impl Into<String>) -> Self {
        self.file_id = Some(id.into());
        self
    }

    /// Stored redacted; see [`redact_url`]
    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(redact_url(url));
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn duration(mut self, elapsed: Duration) -> Self {
        self.duration_ms = Some(elapsed.as_secs_f64() * 1000.0);
        self
    }
}

/// Reduce a URL to `scheme://host/path` for logs (drops query, fragment, credentials)
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            match parsed.port() {
                Some(port) => format!("{}://{}:{}{}", parsed.scheme(), host, port, parsed.path()),
                None => format!("{}://{}{}", parsed.scheme(), host, parsed.path()),
            }
        }
        Err(_) => raw.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}
