// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol DTOs: flat summaries of engine entities for clients.

use atc_core::{
    AgentEvent, AgentId, EventId, Plan, PlanId, PlanStatus, Protocol, Run, RunId, RunStatus,
    Session, SessionId, SessionKind, SessionStatus, StepId, StepStatus, TaskId,
};
use serde::{Deserialize, Serialize};

/// Flat run view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDetail {
    pub id: RunId,
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub status: RunStatus,
    pub policy_profile: String,
    pub step_count: u32,
    pub cost_usd: f64,
    pub tokens_in: u64,
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
}

impl From<&Run> for RunDetail {
    fn from(run: &Run) -> Self {
        Self {
            id: run.id,
            task_id: run.task_id,
            agent_id: run.agent_id,
            status: run.status,
            policy_profile: run.policy_profile.clone(),
            step_count: run.step_count,
            cost_usd: run.cost_usd,
            tokens_in: run.tokens_in,
            tokens_out: run.tokens_out,
            model: run.model.clone(),
            output: run.output.clone(),
            error: run.error.clone(),
            started_at_ms: run.started_at_ms,
            ended_at_ms: run.ended_at_ms,
        }
    }
}

/// Flat step view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDetail {
    pub id: StepId,
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub round: u32,
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Flat plan view with its steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDetail {
    pub id: PlanId,
    pub name: String,
    pub protocol: Protocol,
    pub status: PlanStatus,
    pub max_parallel: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<StepDetail>,
}

impl From<&Plan> for PlanDetail {
    fn from(plan: &Plan) -> Self {
        Self {
            id: plan.id,
            name: plan.name.clone(),
            protocol: plan.protocol,
            status: plan.status,
            max_parallel: plan.max_parallel,
            max_rounds: plan.max_rounds,
            error: plan.error.clone(),
            steps: plan
                .steps
                .iter()
                .map(|step| StepDetail {
                    id: step.id,
                    task_id: step.task_id,
                    agent_id: step.agent_id,
                    status: step.status,
                    run_id: step.run_id,
                    round: step.round,
                    index: step.index,
                    error: step.error.clone(),
                })
                .collect(),
        }
    }
}

/// Flat session view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    pub id: SessionId,
    pub parent_run_id: RunId,
    pub kind: SessionKind,
    pub event_cutoff_id: EventId,
    pub event_cutoff_seq: u64,
    pub new_run_id: RunId,
    pub status: SessionStatus,
}

impl From<&Session> for SessionDetail {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            parent_run_id: session.parent_run_id,
            kind: session.kind,
            event_cutoff_id: session.event_cutoff_id,
            event_cutoff_seq: session.event_cutoff_seq,
            new_run_id: session.new_run_id,
            status: session.status,
        }
    }
}

/// One page of events or audit entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPageDto<T = AgentEvent> {
    pub entries: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub has_more: bool,
    pub total: usize,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
