// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests accepted by the daemon listener.

use atc_core::{
    AgentId, ContextPack, DeliverMode, EventId, EventKind, FailurePolicy, PlanId, Protocol,
    RunId, TaskId,
};
use serde::{Deserialize, Serialize};

/// One step of a plan request, dependencies by declared index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStepRequest {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<usize>,
    #[serde(default)]
    pub deliver_mode: DeliverMode,
}

/// Requests, tagged `{"type": "run:start", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "ping")]
    Ping,

    // -- runs --
    #[serde(rename = "run:start")]
    RunStart {
        task_id: TaskId,
        agent_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        policy_profile: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        idempotency_key: Option<String>,
        #[serde(default, skip_serializing_if = "ContextPack::is_empty")]
        context_pack: ContextPack,
    },

    #[serde(rename = "run:get")]
    RunGet {
        /// Full id or unique prefix.
        run_id: String,
    },

    #[serde(rename = "run:cancel")]
    RunCancel { run_id: RunId },

    #[serde(rename = "run:approve")]
    RunApprove {
        run_id: RunId,
        call_id: String,
        /// "allow" or "deny".
        decision: String,
    },

    #[serde(rename = "run:trajectory")]
    Trajectory {
        run_id: RunId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        types: Vec<EventKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cursor: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },

    #[serde(rename = "run:stats")]
    RunStats { run_id: RunId },

    #[serde(rename = "run:checkpoints")]
    RunCheckpoints { run_id: RunId },

    // -- cost --
    #[serde(rename = "project:cost")]
    ProjectCost { project_id: atc_core::ProjectId },

    // -- plans --
    #[serde(rename = "plan:create")]
    PlanCreate {
        project_id: atc_core::ProjectId,
        name: String,
        protocol: Protocol,
        #[serde(default)]
        max_parallel: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_rounds: Option<u32>,
        #[serde(default)]
        failure_policy: FailurePolicy,
        steps: Vec<PlanStepRequest>,
    },

    #[serde(rename = "plan:start")]
    PlanStart { plan_id: PlanId },

    #[serde(rename = "plan:cancel")]
    PlanCancel { plan_id: PlanId },

    #[serde(rename = "plan:get")]
    PlanGet { plan_id: PlanId },

    // -- sessions --
    #[serde(rename = "session:resume")]
    SessionResume { parent_run_id: RunId },

    #[serde(rename = "session:fork")]
    SessionFork { parent_run_id: RunId, event_cutoff_id: EventId },

    #[serde(rename = "session:rewind")]
    SessionRewind { parent_run_id: RunId, event_cutoff_id: EventId },

    #[serde(rename = "session:replay")]
    SessionReplay { parent_run_id: RunId, checkpoint_id: EventId },

    // -- policies --
    #[serde(rename = "policy:get")]
    PolicyGet { name: String },

    #[serde(rename = "policy:put")]
    PolicyPut { profile: serde_json::Value },

    #[serde(rename = "policy:delete")]
    PolicyDelete { name: String },

    #[serde(rename = "policy:list")]
    PolicyList,

    // -- audit --
    #[serde(rename = "audit:page")]
    AuditPage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        run_id: Option<RunId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        actor: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cursor: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },

    // -- streaming --
    /// Switch this connection to a newline-less event stream: journal
    /// replay from `since_seq`, then live events.
    #[serde(rename = "run:subscribe")]
    Subscribe {
        run_id: RunId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        since_seq: Option<u64>,
    },

    #[serde(rename = "system:shutdown")]
    Shutdown,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
