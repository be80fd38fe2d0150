// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error type; every variant maps to one transport-facing kind.

use atc_core::{AgentId, ErrorKind, PlanId, RunId, TaskId};

/// Failures surfaced by the orchestration kernel.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("run {0} not found")]
    RunNotFound(RunId),
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),
    #[error("plan {0} not found")]
    PlanNotFound(PlanId),
    #[error("project {0} not found")]
    ProjectNotFound(atc_core::ProjectId),
    #[error("agent {0} is {1}, not idle")]
    AgentNotIdle(AgentId, atc_core::AgentStatus),
    #[error("agent {0} has live runs")]
    AgentHasLiveRuns(AgentId),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("run {0} is terminal")]
    TerminalRun(RunId),
    #[error("approval for run {run_id} call {call_id} already pending")]
    DuplicateApproval { run_id: RunId, call_id: String },
    #[error(transparent)]
    Journal(#[from] atc_storage::JournalError),
    #[error(transparent)]
    Worker(#[from] atc_adapters::WorkerError),
    #[error(transparent)]
    Plan(#[from] atc_core::PlanError),
    #[error(transparent)]
    PolicyStore(#[from] atc_policy::StoreError),
    #[error(transparent)]
    IllegalTransition(#[from] atc_core::IllegalTransition),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::RunNotFound(_)
            | EngineError::TaskNotFound(_)
            | EngineError::AgentNotFound(_)
            | EngineError::PlanNotFound(_)
            | EngineError::ProjectNotFound(_) => ErrorKind::NotFound,
            EngineError::AgentNotIdle(..)
            | EngineError::AgentHasLiveRuns(_)
            | EngineError::Conflict(_)
            | EngineError::TerminalRun(_)
            | EngineError::DuplicateApproval { .. } => ErrorKind::Conflict,
            EngineError::Validation(_) | EngineError::Plan(_) => ErrorKind::Validation,
            EngineError::IllegalTransition(_) => ErrorKind::Conflict,
            EngineError::Journal(err) => err.kind(),
            EngineError::Worker(err) => err.kind(),
            EngineError::PolicyStore(err) => match err {
                atc_policy::StoreError::NotFound(_) => ErrorKind::NotFound,
                atc_policy::StoreError::PresetMutation(_) => ErrorKind::Conflict,
                atc_policy::StoreError::InvalidName(_) => ErrorKind::Validation,
                _ => ErrorKind::Internal,
            },
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
