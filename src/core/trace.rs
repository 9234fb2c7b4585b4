// Trace token propagated across every hop of one user interaction

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Header carrying the trace token on every hop
pub const TRACE_HEADER: &str = "X-Trace-ID";

const MAX_TRACE_LEN: usize = 128;

/// Short opaque correlation token.
///
/// Generated by the outermost caller when absent and passed through unchanged
/// by every role afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a fresh 8-character token
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..8].to_string())
    }

    /// Accept an inbound token if it is usable as-is
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > MAX_TRACE_LEN {
            return None;
        }
        if !raw.chars().all(|c| c.is_ascii_graphic()) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    /// Read the token from request headers. A present but unusable value is
    /// logged and treated as absent, which breaks correlation for that caller.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(TRACE_HEADER)?;
        let parsed = value.to_str().ok().and_then(Self::parse);
        if parsed.is_none() {
            warn!(header = TRACE_HEADER, rejected = ?value, "Ignoring unusable inbound trace token");
        }
        parsed
    }

    /// Read the token from request headers, minting one when the caller sent none
    pub fn from_headers_or_generate(headers: &HeaderMap) -> Self {
        Self::from_headers(headers).unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
