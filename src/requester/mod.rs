// Capability requester: chat turns in, tool calls out

pub mod client;
pub mod decider;
pub mod orchestrator;

pub use client::{CapabilityClient, HttpCapabilityClient};
pub use decider::{Decision, KeywordDecider, ProposedToolCall, ToolDecider};
pub use orchestrator::{effective_mode, Requester};
