// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent event types — the atomic unit of observation.
//!
//! Events are append-only per run, ordered by a gap-free `seq`, and carry an
//! internally tagged payload (`{"type": "tool_call", ...}`).

use crate::agent::AgentId;
use crate::run::RunId;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for an agent event.
    pub struct EventId("evt-");
}

/// Terminal outcome signalled by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Succeeded,
    Failed,
    Cancelled,
}

crate::simple_display! {
    TerminalStatus {
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Tag-only event kind, used for trajectory filters and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Thought,
    ToolCall,
    ToolResult,
    Message,
    Checkpoint,
    Cost,
    Terminal,
    ApprovalRequested,
}

crate::simple_display! {
    EventKind {
        Thought => "thought",
        ToolCall => "tool_call",
        ToolResult => "tool_result",
        Message => "message",
        Checkpoint => "checkpoint",
        Cost => "cost",
        Terminal => "terminal",
        ApprovalRequested => "approval_requested",
    }
}

/// Structured action requested by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Worker-assigned call identifier, unique per run.
    pub call_id: String,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub args: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(call_id: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool: tool.into(),
            path: None,
            command: None,
            args: HashMap::new(),
        }
    }

    crate::setters! {
        option {
            path: String,
            command: String,
        }
    }
}

/// Sub-step specification emitted by a hierarchical coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstepSpec {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_profile: Option<String>,
    /// Indexes (into the emitted list) of substeps this one depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<usize>,
}

/// Typed event payload.
///
/// Serializes with `{"type": "tool_call", ...fields}` format.
/// Unknown type tags deserialize to `Custom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Thought {
        text: String,
    },

    ToolCall {
        #[serde(flatten)]
        call: ToolCall,
    },

    ToolResult {
        call_id: String,
        ok: bool,
        /// True when the result was synthesized for a denied call.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        blocked: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },

    Message {
        text: String,
        /// Ping-pong acceptance marker.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        accepted: bool,
        /// Hierarchical coordinators emit child step specifications here.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        substeps: Vec<SubstepSpec>,
    },

    Checkpoint {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },

    Cost {
        model: String,
        tokens_in: u64,
        tokens_out: u64,
        cost_usd: f64,
    },

    Terminal {
        status: TerminalStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },

    ApprovalRequested {
        call_id: String,
        reason: String,
    },

    /// Catch-all for unknown payload types (extensibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl EventPayload {
    /// Tag-only kind for filtering and stats. `Custom` has no kind.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            EventPayload::Thought { .. } => Some(EventKind::Thought),
            EventPayload::ToolCall { .. } => Some(EventKind::ToolCall),
            EventPayload::ToolResult { .. } => Some(EventKind::ToolResult),
            EventPayload::Message { .. } => Some(EventKind::Message),
            EventPayload::Checkpoint { .. } => Some(EventKind::Checkpoint),
            EventPayload::Cost { .. } => Some(EventKind::Cost),
            EventPayload::Terminal { .. } => Some(EventKind::Terminal),
            EventPayload::ApprovalRequested { .. } => Some(EventKind::ApprovalRequested),
            EventPayload::Custom => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventPayload::Terminal { .. })
    }

    /// Short summary for log lines.
    pub fn log_summary(&self) -> String {
        match self {
            EventPayload::Thought { .. } => "thought".to_string(),
            EventPayload::ToolCall { call } => format!("tool_call {}", call.tool),
            EventPayload::ToolResult { call_id, ok, .. } => {
                format!("tool_result {} ok={}", call_id, ok)
            }
            EventPayload::Message { .. } => "message".to_string(),
            EventPayload::Checkpoint { .. } => "checkpoint".to_string(),
            EventPayload::Cost { model, .. } => format!("cost {}", model),
            EventPayload::Terminal { status, .. } => format!("terminal {}", status),
            EventPayload::ApprovalRequested { call_id, .. } => {
                format!("approval_requested {}", call_id)
            }
            EventPayload::Custom => "custom".to_string(),
        }
    }
}

/// One observed event of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub id: EventId,
    pub run_id: RunId,
    pub task_id: TaskId,
    pub agent_id: AgentId,
    /// Monotonic, gap-free per run. Assigned by the journal on append.
    #[serde(default)]
    pub seq: u64,
    /// Wall clock, monotonic per run.
    pub at_ms: u64,
    #[serde(flatten)]
    pub payload: EventPayload,
    /// Safe point for resume/fork/replay.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub checkpoint: bool,
    /// Links a tool_result back to its tool_call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<EventId>,
}

impl AgentEvent {
    pub fn new(run_id: RunId, task_id: TaskId, agent_id: AgentId, at_ms: u64, payload: EventPayload) -> Self {
        let checkpoint = matches!(payload, EventPayload::Checkpoint { .. });
        Self {
            id: EventId::new(),
            run_id,
            task_id,
            agent_id,
            seq: 0,
            at_ms,
            payload,
            checkpoint,
            parent_event_id: None,
        }
    }

    pub fn kind(&self) -> Option<EventKind> {
        self.payload.kind()
    }

    pub fn is_terminal(&self) -> bool {
        self.payload.is_terminal()
    }

    /// Mark this event as a checkpoint.
    pub fn with_checkpoint(mut self) -> Self {
        self.checkpoint = true;
        self
    }

    pub fn with_parent(mut self, parent: EventId) -> Self {
        self.parent_event_id = Some(parent);
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
