// Per-trace flow store
//
// Each trace token owns its own ordered list of steps; overlapping turns
// never interleave. Recording never fails, a poisoned lock is recovered.

use super::FlowStep;
use crate::core::trace::TraceId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct FlowRecorder {
    turns: Mutex<HashMap<TraceId, Vec<FlowStep>>>,
}

impl FlowRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TraceId, Vec<FlowStep>>> {
        self.turns.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a fresh turn for `trace`, discarding anything left from a previous one
    pub fn begin_turn(&self, trace: &TraceId) {
        self.lock().insert(trace.clone(), Vec::new());
    }

    /// Append a hop to its trace's sequence
    pub fn record(&self, step: FlowStep) {
        self.lock().entry(step.trace_id.clone()).or_default().push(step);
    }

    /// Snapshot of the steps recorded so far for `trace`
    pub fn steps(&self, trace: &TraceId) -> Vec<FlowStep> {
        self.lock().get(trace).cloned().unwrap_or_default()
    }

    /// Number of traces currently holding steps
    pub fn active_traces(&self) -> usize {
        self.lock().len()
    }

    /// Close the turn: remove its steps and hand them back as a summary
    pub fn finish_turn(&self, trace: &TraceId) -> FlowSummary {
        let steps = self.lock().remove(trace).unwrap_or_default();
        FlowSummary {
            trace_id: trace.clone(),
            steps,
        }
    }
}

/// Ordered hops of one finished turn
#[derive(Debug, Clone)]
pub struct FlowSummary {
    pub trace_id: TraceId,
    pub steps: Vec<FlowStep>,
}

impl FlowSummary {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

const RULE_WIDTH: usize = 80;

impl fmt::Display for FlowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{}", rule)?;
        writeln!(f, "MESSAGE FLOW SUMMARY (trace_id={})", self.trace_id)?;
        writeln!(f, "{}", rule)?;

        for (index, step) in self.steps.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "Step {}: {} → {}", index + 1, step.sender, step.receiver)?;
            writeln!(f, "  {}", step.description)?;

            let mut identifiers = vec![format!("trace_id={}", step.trace_id)];
            if let Some(ref id) = step.request_id {
                identifiers.push(format!("request_id={}", id));
            }
            if let Some(ref id) = step.file_id {
                identifiers.push(format!("file_id={}", id));
            }
            if let Some(ref url) = step.url {
                identifiers.push(format!("url={}", url));
            }

            let mut status_line = String::new();
            if let Some(ref status) = step.status {
                status_line.push_str(&format!(" | Status: {}", status));
            }
            if let Some(ms) = step.duration_ms {
                status_line.push_str(&format!(" | Duration: {:.2}ms", ms));
            }
            writeln!(f, "  Identifiers: {}{}", identifiers.join(", "), status_line)?;
        }

        writeln!(f)?;
        write!(f, "{}", rule)
    }
}
