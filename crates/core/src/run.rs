// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identifier and state machine.

use crate::agent::AgentId;
use crate::event::TerminalStatus;
use crate::project::ProjectId;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a run instance.
    ///
    /// Each execution attempt of a task gets a unique ID that keys its
    /// event journal, status queries, and log references.
    pub struct RunId("run-");
}

/// Status of a run.
///
/// Transitions: `queued → running ↔ awaiting_approval → terminal`;
/// `cancelling` is entered on user cancel from any live state.
/// Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    AwaitingApproval,
    Cancelling,
    Succeeded,
    Failed,
    Cancelled,
}

crate::simple_display! {
    RunStatus {
        Queued => "queued",
        Running => "running",
        AwaitingApproval => "awaiting_approval",
        Cancelling => "cancelling",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed | RunStatus::Cancelled)
    }

    /// Whether a transition from `self` to `next` is legal.
    pub fn can_transition(&self, next: RunStatus) -> bool {
        use RunStatus::*;
        match (self, next) {
            // Terminal states are absorbing.
            (s, _) if s.is_terminal() => false,
            (Queued, Running) => true,
            (Queued, Failed) | (Queued, Cancelled) => true,
            (Running, AwaitingApproval) => true,
            (Running, Succeeded) | (Running, Failed) | (Running, Cancelled) => true,
            (AwaitingApproval, Running) => true,
            (AwaitingApproval, Failed) | (AwaitingApproval, Cancelled) => true,
            (Queued, Cancelling)
            | (Running, Cancelling)
            | (AwaitingApproval, Cancelling) => true,
            (Cancelling, Succeeded) | (Cancelling, Failed) | (Cancelling, Cancelled) => true,
            _ => false,
        }
    }
}

impl From<TerminalStatus> for RunStatus {
    fn from(t: TerminalStatus) -> Self {
        match t {
            TerminalStatus::Succeeded => RunStatus::Succeeded,
            TerminalStatus::Failed => RunStatus::Failed,
            TerminalStatus::Cancelled => RunStatus::Cancelled,
        }
    }
}

/// Configuration for creating a new run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub project_id: ProjectId,
    pub policy_profile: String,
    pub mode_id: Option<String>,
    pub idempotency_key: Option<String>,
}

impl RunConfig {
    pub fn new(task_id: TaskId, agent_id: AgentId, project_id: ProjectId) -> Self {
        Self {
            task_id,
            agent_id,
            project_id,
            policy_profile: String::new(),
            mode_id: None,
            idempotency_key: None,
        }
    }

    crate::setters! {
        into {
            policy_profile: String,
        }
        option {
            mode_id: String,
            idempotency_key: String,
        }
    }
}

/// One concrete execution attempt of a task by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub project_id: ProjectId,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_id: Option<String>,
    pub policy_profile: String,
    /// Number of tool calls the run has made so far.
    #[serde(default)]
    pub step_count: u32,
    #[serde(default)]
    pub cost_usd: f64,
    #[serde(default)]
    pub tokens_in: u64,
    #[serde(default)]
    pub tokens_out: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Highest worker_seq accepted from the worker stream, for dedup.
    #[serde(default)]
    pub worker_high_seq: u64,
}

impl Run {
    pub fn new(id: RunId, config: RunConfig, epoch_ms: u64) -> Self {
        Self {
            id,
            task_id: config.task_id,
            agent_id: config.agent_id,
            project_id: config.project_id,
            status: RunStatus::Queued,
            mode_id: config.mode_id,
            policy_profile: config.policy_profile,
            step_count: 0,
            cost_usd: 0.0,
            tokens_in: 0,
            tokens_out: 0,
            model: None,
            output: None,
            error: None,
            started_at_ms: epoch_ms,
            ended_at_ms: None,
            idempotency_key: config.idempotency_key,
            worker_high_seq: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a status transition, rejecting illegal ones.
    ///
    /// Idempotent for same-status applies on non-terminal states.
    pub fn transition(&mut self, next: RunStatus) -> Result<(), IllegalTransition> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition(next) {
            return Err(IllegalTransition { from: self.status, to: next });
        }
        self.status = next;
        Ok(())
    }

    /// Finalize with a terminal status, recording the end time once.
    pub fn finalize(
        &mut self,
        terminal: TerminalStatus,
        error: Option<String>,
        output: Option<String>,
        epoch_ms: u64,
    ) -> Result<(), IllegalTransition> {
        self.transition(terminal.into())?;
        if self.ended_at_ms.is_none() {
            self.ended_at_ms = Some(epoch_ms);
        }
        if self.error.is_none() {
            self.error = error;
        }
        if self.output.is_none() {
            self.output = output;
        }
        Ok(())
    }
}

/// Rejected run status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal run transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: RunStatus,
    pub to: RunStatus,
}

crate::builder! {
    pub struct RunBuilder => Run {
        into {
            policy_profile: String = "full-access",
        }
        set {
            id: RunId = RunId::new(),
            task_id: TaskId = TaskId::new(),
            agent_id: AgentId = AgentId::new(),
            project_id: ProjectId = ProjectId::new(),
            status: RunStatus = RunStatus::Queued,
            step_count: u32 = 0,
            cost_usd: f64 = 0.0,
            tokens_in: u64 = 0,
            tokens_out: u64 = 0,
            started_at_ms: u64 = 1_000_000,
            worker_high_seq: u64 = 0,
        }
        option {
            mode_id: String = None,
            model: String = None,
            output: String = None,
            error: String = None,
            ended_at_ms: u64 = None,
            idempotency_key: String = None,
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
