// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Responses produced by the daemon listener.

use crate::types::{PlanDetail, RunDetail, SessionDetail, TrajectoryPageDto};
use atc_core::{AgentEvent, AuditEntry, ErrorKind};
use serde::{Deserialize, Serialize};

/// Responses, tagged `{"type": "run", ...}`.
///
/// Domain errors carry their [`ErrorKind`] so thin clients can map to
/// transport status codes without string matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    #[serde(rename = "pong")]
    Pong,

    #[serde(rename = "ok")]
    Ok,

    #[serde(rename = "run")]
    Run { run: RunDetail },

    #[serde(rename = "approval")]
    Approval {
        /// Whether a waiter consumed the decision.
        consumed: bool,
    },

    #[serde(rename = "trajectory")]
    Trajectory { page: TrajectoryPageDto<AgentEvent> },

    #[serde(rename = "stats")]
    Stats { stats: serde_json::Value },

    #[serde(rename = "checkpoints")]
    Checkpoints { events: Vec<AgentEvent> },

    #[serde(rename = "cost")]
    Cost { summary: atc_core::CostSummary },

    #[serde(rename = "plan")]
    Plan { plan: PlanDetail },

    #[serde(rename = "session")]
    Session { session: SessionDetail },

    #[serde(rename = "policy")]
    Policy { profile: serde_json::Value },

    #[serde(rename = "policy:deleted")]
    PolicyDeleted { existed: bool },

    #[serde(rename = "policy:list")]
    PolicyList { names: Vec<String> },

    #[serde(rename = "audit")]
    Audit { page: TrajectoryPageDto<AuditEntry> },

    /// Stream frame: one journaled or live event.
    #[serde(rename = "event")]
    Event { event: AgentEvent },

    /// Stream frame: replay finished, live events follow.
    #[serde(rename = "live")]
    Live,

    #[serde(rename = "error")]
    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error { kind, message: message.into() }
    }

    /// Internal faults never leak details to clients.
    pub fn internal() -> Self {
        Response::Error { kind: ErrorKind::Internal, message: "internal error".into() }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
