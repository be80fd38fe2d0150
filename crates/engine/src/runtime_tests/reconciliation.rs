// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atc_core::{AgentEvent, AgentStatus, Clock, EventPayload, RunStatus, TerminalStatus};

#[tokio::test]
async fn rebuild_reconstructs_run_rows_from_journal() {
    let h = harness();
    let run_id = atc_core::RunId::new();
    let task_id = atc_core::TaskId::new();
    let agent_id = atc_core::AgentId::new();
    h.runtime.journal().create(run_id).unwrap();
    h.runtime
        .journal()
        .append(AgentEvent::new(
            run_id,
            task_id,
            agent_id,
            1_000,
            EventPayload::ToolCall { call: ToolCall::new("c1", "Read") },
        ))
        .unwrap();
    h.runtime
        .journal()
        .append(AgentEvent::new(
            run_id,
            task_id,
            agent_id,
            1_500,
            EventPayload::Cost {
                model: "sonnet".into(),
                tokens_in: 10,
                tokens_out: 5,
                cost_usd: 0.001,
            },
        ))
        .unwrap();
    h.runtime
        .journal()
        .append(AgentEvent::new(
            run_id,
            task_id,
            agent_id,
            2_000,
            EventPayload::Terminal {
                status: TerminalStatus::Succeeded,
                reason: None,
                output: Some("ok".into()),
            },
        ))
        .unwrap();

    let report = h.runtime.recover().unwrap();
    assert_eq!(report.rebuilt, 1);

    let run = h.run(run_id);
    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.task_id, task_id);
    assert_eq!(run.step_count, 1);
    assert_eq!(run.tokens_in, 10);
    assert_eq!(run.output.as_deref(), Some("ok"));
    assert_eq!(run.started_at_ms, 1_000);
    assert_eq!(run.ended_at_ms, Some(2_000));
    // Terminal runs are not reconciled further.
    assert_eq!(report.approval_lost + report.process_restart, 0);
}

#[tokio::test]
async fn orphaned_awaiting_approval_fails_with_approval_lost() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.runtime.registry().set_agent_status(agent.id, AgentStatus::Busy);
    let run = Run::builder()
        .task_id(task.id)
        .agent_id(agent.id)
        .project_id(h.project.id)
        .status(RunStatus::AwaitingApproval)
        .started_at_ms(h.clock.epoch_ms())
        .build();
    h.runtime.registry().insert_run(run.clone());
    h.runtime.journal().create(run.id).unwrap();

    let report = h.runtime.recover().unwrap();
    assert_eq!(report.approval_lost, 1);

    let failed = h.run(run.id);
    assert_eq!(failed.status, RunStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("approval_lost"));
    assert_eq!(h.runtime.registry().get_agent(agent.id).unwrap().status, AgentStatus::Idle);
}

#[tokio::test]
async fn stale_running_run_fails_with_process_restart() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    let run = Run::builder()
        .task_id(task.id)
        .agent_id(agent.id)
        .project_id(h.project.id)
        .status(RunStatus::Running)
        .started_at_ms(h.clock.epoch_ms())
        .build();
    h.runtime.registry().insert_run(run.clone());
    h.runtime.journal().create(run.id).unwrap();

    // Older than the 5s staleness threshold configured in the harness.
    h.clock.advance(std::time::Duration::from_secs(10));

    let report = h.runtime.recover().unwrap();
    assert_eq!(report.process_restart, 1);
    let failed = h.run(run.id);
    assert_eq!(failed.status, RunStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("process_restart"));
}

#[tokio::test]
async fn fresh_running_run_is_left_alone() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    let run = Run::builder()
        .task_id(task.id)
        .agent_id(agent.id)
        .project_id(h.project.id)
        .status(RunStatus::Running)
        .started_at_ms(h.clock.epoch_ms())
        .build();
    h.runtime.registry().insert_run(run.clone());
    h.runtime.journal().create(run.id).unwrap();

    let report = h.runtime.recover().unwrap();
    assert_eq!(report.process_restart, 0);
    assert_eq!(h.run(run.id).status, RunStatus::Running);
}

#[tokio::test]
async fn orphan_with_journal_terminal_takes_worker_verdict() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    let run = Run::builder()
        .task_id(task.id)
        .agent_id(agent.id)
        .project_id(h.project.id)
        .status(RunStatus::Running)
        .started_at_ms(h.clock.epoch_ms())
        .build();
    h.runtime.registry().insert_run(run.clone());
    h.runtime.journal().create(run.id).unwrap();
    // The worker finished but the old process died before folding it in.
    h.runtime
        .journal()
        .append(AgentEvent::new(
            run.id,
            task.id,
            agent.id,
            h.clock.epoch_ms(),
            EventPayload::Terminal {
                status: TerminalStatus::Succeeded,
                reason: None,
                output: Some("landed".into()),
            },
        ))
        .unwrap();
    h.clock.advance(std::time::Duration::from_secs(10));

    h.runtime.recover().unwrap();
    let recovered = h.run(run.id);
    assert_eq!(recovered.status, RunStatus::Succeeded);
    assert_eq!(recovered.output.as_deref(), Some("landed"));
}
