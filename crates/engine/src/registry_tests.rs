// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atc_core::{Agent, AgentStatus, Run, RunStatus, Task};

#[test]
fn insert_and_get_run() {
    let registry = Registry::new();
    let run = Run::builder().build();
    registry.insert_run(run.clone());
    assert_eq!(registry.get_run(run.id).map(|r| r.id), Some(run.id));
}

#[test]
fn find_run_by_unique_prefix() {
    let registry = Registry::new();
    let run = Run::builder().build();
    registry.insert_run(run.clone());
    let prefix = &run.id.as_str()[..10];
    assert_eq!(registry.find_run(prefix).map(|r| r.id), Some(run.id));
    assert!(registry.find_run("run-zzzz").is_none());
}

#[test]
fn idempotency_key_resolves_to_run() {
    let registry = Registry::new();
    let run = Run::builder().idempotency_key("key-1").build();
    registry.insert_run(run.clone());
    assert_eq!(registry.run_for_idempotency_key("key-1").map(|r| r.id), Some(run.id));
    assert!(registry.run_for_idempotency_key("key-2").is_none());
}

#[test]
fn update_run_mutates_in_place() {
    let registry = Registry::new();
    let run = Run::builder().build();
    registry.insert_run(run.clone());
    registry.update_run(run.id, |r| r.step_count = 7);
    assert_eq!(registry.get_run(run.id).map(|r| r.step_count), Some(7));
    assert!(registry.update_run(atc_core::RunId::new(), |_| ()).is_none());
}

#[test]
fn agent_live_runs_excludes_terminal() {
    let registry = Registry::new();
    let agent = Agent::builder().build();
    registry.insert_agent(agent.clone());
    let live = Run::builder().agent_id(agent.id).status(RunStatus::Running).build();
    let done = Run::builder().agent_id(agent.id).status(RunStatus::Succeeded).build();
    registry.insert_run(live.clone());
    registry.insert_run(done);
    assert_eq!(registry.agent_live_runs(agent.id), vec![live.id]);
}

#[test]
fn non_terminal_runs_filtering() {
    let registry = Registry::new();
    registry.insert_run(Run::builder().status(RunStatus::Running).build());
    registry.insert_run(Run::builder().status(RunStatus::Failed).build());
    registry.insert_run(Run::builder().status(RunStatus::AwaitingApproval).build());
    assert_eq!(registry.non_terminal_runs().len(), 2);
}

#[test]
fn runs_for_project_scopes_by_id() {
    let registry = Registry::new();
    let run = Run::builder().build();
    registry.insert_run(run.clone());
    registry.insert_run(Run::builder().build());
    assert_eq!(registry.runs_for_project(run.project_id).len(), 1);
}

#[test]
fn snapshot_roundtrips_through_serde() {
    let registry = Registry::new();
    registry.insert_task(Task::builder().title("t").build());
    registry.insert_run(Run::builder().idempotency_key("k").build());

    let snapshot = registry.snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: RegistrySnapshot = serde_json::from_str(&json).unwrap();
    let restored = Registry::from_snapshot(parsed);
    assert!(restored.run_for_idempotency_key("k").is_some());
    assert_eq!(restored.read(|s| s.tasks.len()), 1);
}

#[test]
fn set_agent_status_updates() {
    let registry = Registry::new();
    let agent = Agent::builder().build();
    registry.insert_agent(agent.clone());
    registry.set_agent_status(agent.id, AgentStatus::Busy);
    assert_eq!(registry.get_agent(agent.id).map(|a| a.status), Some(AgentStatus::Busy));
}
