// Per-turn orchestration: decide, correct the mode, call the capability,
// turn the outcome into exactly one caller-facing reply

use super::client::CapabilityClient;
use super::decider::ToolDecider;
use crate::core::models::{
    ChatReply, ChatRequest, CompletionAck, CompletionNotification, Elicitation, FileProcessArgs,
    InteractivePrompt, PromptMode, ToolOutcome, UploadMode, DEFAULT_UPLOAD_PROMPT,
};
use crate::core::trace::TraceId;
use crate::flow::{redact_url, Component, FlowRecorder, FlowStep, FlowSummary};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub const SELECT_FILE_TEXT: &str = "Please select a file to upload.";
pub const PROCESSING_TEXT: &str = "Processing your attached file...";
pub const USE_URL_TEXT: &str = "Please use the provided URL to upload your file.";
pub const APOLOGY_TEXT: &str = "Sorry, I couldn't handle that request right now. Please try again.";

/// Mode actually sent to the capability server.
///
/// Holding the bytes always means `Direct`, not holding them always means
/// `Interactive`, whatever was suggested.
pub fn effective_mode(suggested: Option<&str>, has_attached_file: bool, trace: &TraceId) -> UploadMode {
    let forced = UploadMode::for_attachment(has_attached_file);
    if let Some(raw) = suggested {
        if UploadMode::from_wire(raw) != Some(forced) {
            info!(
                component = "REQUESTER",
                event = "mode_override",
                trace_id = %trace,
                suggested = %raw,
                effective = %forced,
                has_attached_file,
                "Overriding suggested upload mode"
            );
        }
    }
    forced
}

pub fn fault_text(message: &str) -> String {
    format!("I tried to initiate a file upload, but encountered an error: {}", message)
}

pub struct Requester {
    decider: Arc<dyn ToolDecider>,
    client: Arc<dyn CapabilityClient>,
    recorder: Arc<FlowRecorder>,
}

impl Requester {
    pub fn new(
        decider: Arc<dyn ToolDecider>,
        client: Arc<dyn CapabilityClient>,
        recorder: Arc<FlowRecorder>,
    ) -> Self {
        Self {
            decider,
            client,
            recorder,
        }
    }

    pub fn recorder(&self) -> &Arc<FlowRecorder> {
        &self.recorder
    }

    /// Handle one chat turn. Never fails: every fault becomes reply text.
    pub async fn handle_turn(&self, request: ChatRequest, trace: TraceId) -> ChatReply {
        let (reply, summary) = self.handle_turn_traced(request, trace).await;
        info!(trace_id = %summary.trace_id, "\n{}", summary);
        reply
    }

    /// Same as [`Requester::handle_turn`], also handing back the turn's recorded hops
    pub async fn handle_turn_traced(&self, request: ChatRequest, trace: TraceId) -> (ChatReply, FlowSummary) {
        self.recorder.begin_turn(&trace);
        self.recorder.record(FlowStep::new(
            Component::Ui,
            Component::Requester,
            &trace,
            format!("User message (file_attached={})", request.has_attached_file),
        ));

        let reply = self.run_turn(&request, &trace).await;

        self.recorder.record(
            FlowStep::new(Component::Requester, Component::Ui, &trace, "Reply to user").status(
                if reply.elicitation.is_some() {
                    "elicitation"
                } else {
                    "text"
                },
            ),
        );

        let summary = self.recorder.finish_turn(&trace);
        (reply, summary)
    }

    async fn run_turn(&self, request: &ChatRequest, trace: &TraceId) -> ChatReply {
        let started = Instant::now();
        self.recorder.record(FlowStep::new(
            Component::Requester,
            Component::Decider,
            trace,
            "Decide tool use",
        ));

        let decision = match self.decider.decide(&request.message, request.has_attached_file).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(component = "DECIDER", trace_id = %trace, error = %e, "Decider failed");
                self.recorder.record(
                    FlowStep::new(Component::Decider, Component::Requester, trace, "Decider failed")
                        .status("error")
                        .duration(started.elapsed()),
                );
                return ChatReply::text(APOLOGY_TEXT);
            }
        };

        self.recorder.record(
            FlowStep::new(
                Component::Decider,
                Component::Requester,
                trace,
                format!(
                    "Decision with {} tool call(s)",
                    usize::from(decision.tool_call.is_some())
                ),
            )
            .duration(started.elapsed()),
        );

        let Some(call) = decision.tool_call else {
            return ChatReply::text(decision.reply_text);
        };

        let args = FileProcessArgs {
            message: call
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_UPLOAD_PROMPT.to_string()),
            mode: effective_mode(call.mode.as_deref(), request.has_attached_file, trace),
        };

        let outcome = self.invoke(&call.name, &args, trace).await;
        self.reply_for(outcome, decision.reply_text, request.has_attached_file, trace)
    }

    async fn invoke(&self, name: &str, args: &FileProcessArgs, trace: &TraceId) -> ToolOutcome {
        let started = Instant::now();
        self.recorder.record(FlowStep::new(
            Component::McpClient,
            Component::McpServer,
            trace,
            format!("tools/call {} (mode={})", name, args.mode),
        ));

        let outcome = match self.client.call_tool(name, args, trace).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    component = "MCP_CLIENT",
                    trace_id = %trace,
                    tool_name = %name,
                    error = %e,
                    "Capability call failed"
                );
                ToolOutcome::fault(e.user_message())
            }
        };

        let step = FlowStep::new(Component::McpServer, Component::McpClient, trace, describe(&outcome))
            .duration(started.elapsed());
        let step = match &outcome {
            ToolOutcome::Deferred(d) => step.url(&d.url).status("elicitation_required"),
            ToolOutcome::Direct(d) => step.url(&d.url).status("success"),
            ToolOutcome::Fault { .. } => step.status("error"),
        };
        self.recorder.record(step);

        outcome
    }

    fn reply_for(
        &self,
        outcome: ToolOutcome,
        reply_text: String,
        has_attached_file: bool,
        trace: &TraceId,
    ) -> ChatReply {
        match outcome {
            ToolOutcome::Deferred(descriptor) => {
                info!(
                    component = "REQUESTER",
                    direction = "←",
                    event = "elicitation_url_received",
                    trace_id = %trace,
                    upload_url_host = %redact_url(&descriptor.url),
                    "Received URL-mode elicitation"
                );
                let message = descriptor
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_UPLOAD_PROMPT.to_string());
                ChatReply {
                    response: non_empty_or(reply_text, SELECT_FILE_TEXT),
                    elicitation: Some(Elicitation::Interactive(InteractivePrompt {
                        mode: PromptMode::Interactive,
                        message,
                        url: descriptor.url,
                    })),
                }
            }
            ToolOutcome::Direct(descriptor) => {
                info!(
                    component = "REQUESTER",
                    direction = "←",
                    event = "stream_upload_received",
                    trace_id = %trace,
                    upload_url_host = %redact_url(&descriptor.url),
                    "Received direct transfer descriptor"
                );
                let fallback = if has_attached_file {
                    PROCESSING_TEXT
                } else {
                    USE_URL_TEXT
                };
                ChatReply {
                    response: non_empty_or(reply_text, fallback),
                    elicitation: Some(Elicitation::Direct(descriptor)),
                }
            }
            ToolOutcome::Fault { code, message } => {
                warn!(component = "REQUESTER", trace_id = %trace, code = ?code, error = %message, "Tool call fault");
                ChatReply::text(fault_text(&message))
            }
        }
    }

    /// Close the loop once the transfer endpoint accepted the bytes
    pub fn complete(&self, notification: &CompletionNotification, trace: &TraceId) -> CompletionAck {
        info!(
            component = "REQUESTER",
            direction = "←",
            event = "upload_complete",
            trace_id = %trace,
            file_id = %notification.file_id,
            "File upload completed"
        );

        self.recorder.record(
            FlowStep::new(Component::Ui, Component::Requester, trace, "Upload completion notification")
                .file_id(notification.file_id.clone())
                .status("success"),
        );
        let summary = self.recorder.finish_turn(trace);
        debug!(trace_id = %trace, "\n{}", summary);

        CompletionAck {
            status: "success".to_string(),
            message: "File upload completed".to_string(),
        }
    }
}

fn describe(outcome: &ToolOutcome) -> String {
    match outcome {
        ToolOutcome::Deferred(_) => "URL elicitation required (-32042)".to_string(),
        ToolOutcome::Direct(_) => "Direct transfer descriptor".to_string(),
        ToolOutcome::Fault { code: Some(code), .. } => format!("Tool call fault ({})", code),
        ToolOutcome::Fault { code: None, .. } => "Tool call fault".to_string(),
    }
}

fn non_empty_or(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}
