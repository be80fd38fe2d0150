// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atc_core::{AgentStatus, RunId};

#[yare::parameterized(
    run_not_found   = { EngineError::RunNotFound(RunId::new()), ErrorKind::NotFound },
    task_not_found  = { EngineError::TaskNotFound(TaskId::new()), ErrorKind::NotFound },
    agent_not_idle  = { EngineError::AgentNotIdle(AgentId::new(), AgentStatus::Busy), ErrorKind::Conflict },
    live_runs       = { EngineError::AgentHasLiveRuns(AgentId::new()), ErrorKind::Conflict },
    validation      = { EngineError::Validation("bad".into()), ErrorKind::Validation },
    conflict        = { EngineError::Conflict("dup".into()), ErrorKind::Conflict },
    terminal_run    = { EngineError::TerminalRun(RunId::new()), ErrorKind::Conflict },
)]
fn kinds_map_one_to_one(err: EngineError, kind: ErrorKind) {
    assert_eq!(err.kind(), kind);
}

#[test]
fn duplicate_approval_is_conflict() {
    let err = EngineError::DuplicateApproval { run_id: RunId::new(), call_id: "c1".into() };
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn journal_error_kind_passes_through() {
    let err: EngineError = atc_storage::JournalError::UnknownRun(RunId::new()).into();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn worker_error_kind_passes_through() {
    let err: EngineError = atc_adapters::WorkerError::AckTimeout.into();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[test]
fn policy_store_preset_mutation_is_conflict() {
    let err: EngineError = atc_policy::StoreError::PresetMutation("full-access".into()).into();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
