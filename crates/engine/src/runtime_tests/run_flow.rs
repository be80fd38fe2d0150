// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::approval::ApprovalDecision;
use crate::runtime::StartRequest;
use atc_core::{AgentStatus, EventKind, TaskStatus};

#[tokio::test]
async fn run_completes_and_releases_agent() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(task.id, read_then_succeed());

    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("full-access"))
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Running);

    h.wait_for_status(run.id, RunStatus::Succeeded).await;
    let done = h.run(run.id);
    assert_eq!(done.output.as_deref(), Some("done"));
    assert_eq!(done.step_count, 1);
    assert!(done.ended_at_ms.is_some());

    let events = h.runtime.journal().load_by_run(run.id).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events.last().unwrap().kind(), Some(EventKind::Terminal));

    assert_eq!(h.runtime.registry().get_agent(agent.id).unwrap().status, AgentStatus::Idle);
    assert_eq!(h.runtime.registry().get_task(task.id).unwrap().status, TaskStatus::Succeeded);
}

#[tokio::test]
async fn idempotency_key_returns_prior_run() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(task.id, read_then_succeed());

    let request = StartRequest::new(task.id, agent.id)
        .policy_profile("full-access")
        .idempotency_key("once");
    let first = h.runtime.start(request.clone()).await.unwrap();
    h.wait_for_status(first.id, RunStatus::Succeeded).await;

    let second = h.runtime.start(request).await.unwrap();
    assert_eq!(second.id, first.id);
}

#[tokio::test]
async fn start_rejects_busy_agent() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.runtime.registry().set_agent_status(agent.id, AgentStatus::Busy);

    let err = h
        .runtime
        .start(StartRequest::new(task.id, agent.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), atc_core::ErrorKind::Conflict);
}

#[tokio::test]
async fn start_rejects_cross_project_pairing() {
    let h = harness();
    let (task, _) = h.seed_task_agent("t1");
    let foreign_project = atc_core::Project::builder().build();
    h.runtime.create_project(foreign_project.clone());
    let foreign_agent = atc_core::Agent::builder()
        .project_id(foreign_project.id)
        .backend_kind("fake")
        .build();
    h.runtime.create_agent(foreign_agent.clone());

    let err = h
        .runtime
        .start(StartRequest::new(task.id, foreign_agent.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), atc_core::ErrorKind::Validation);
}

#[tokio::test]
async fn dispatch_exhaustion_fails_run() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.fail_dispatches(10);

    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("full-access"))
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.error.as_deref(), Some("dispatch_timeout"));
    assert_eq!(h.runtime.registry().get_agent(agent.id).unwrap().status, AgentStatus::Idle);
}

#[tokio::test]
async fn worker_duplicates_are_deduplicated() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(task.id, read_then_succeed());
    h.worker.duplicate_seqs(true);

    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("full-access"))
        .await
        .unwrap();
    h.wait_for_status(run.id, RunStatus::Succeeded).await;

    let events = h.runtime.journal().load_by_run(run.id).unwrap();
    assert_eq!(events.len(), 3, "duplicates must not reach the journal");
}

#[tokio::test]
async fn policy_deny_terminates_run() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(
        task.id,
        vec![EventPayload::ToolCall { call: ToolCall::new("c1", "Delete").path("/") }],
    );

    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("headless-safe-sandbox"))
        .await
        .unwrap();
    h.wait_for_status(run.id, RunStatus::Failed).await;

    let failed = h.run(run.id);
    assert_eq!(failed.error.as_deref(), Some("policy_deny"));
    assert_eq!(h.runtime.registry().get_agent(agent.id).unwrap().status, AgentStatus::Idle);

    let events = h.runtime.journal().load_by_run(run.id).unwrap();
    let kinds: Vec<_> = events.iter().filter_map(|e| e.kind()).collect();
    assert_eq!(kinds, vec![EventKind::ToolCall, EventKind::ToolResult, EventKind::Terminal]);
    // The synthetic result is blocked and linked to its call.
    match &events[1].payload {
        EventPayload::ToolResult { blocked, .. } => assert!(blocked),
        other => panic!("expected tool_result, got {:?}", other),
    }
    assert_eq!(events[1].parent_event_id, Some(events[0].id));
}

#[tokio::test]
async fn ask_then_allow_resumes_run() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(
        task.id,
        vec![
            EventPayload::ToolCall { call: ToolCall::new("c1", "Bash").command("ls") },
            EventPayload::ToolResult {
                call_id: "c1".into(),
                ok: true,
                blocked: false,
                reason: None,
                output: Some("src".into()),
            },
            terminal(TerminalStatus::Succeeded),
        ],
    );

    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("headless-safe-sandbox"))
        .await
        .unwrap();
    h.wait_for_status(run.id, RunStatus::AwaitingApproval).await;
    assert_eq!(h.runtime.approvals().pending_calls(run.id), vec!["c1"]);

    assert!(h.runtime.resolve_approval(run.id, "c1", ApprovalDecision::Allow, "alice"));
    h.wait_for_status(run.id, RunStatus::Succeeded).await;

    let events = h.runtime.journal().load_by_run(run.id).unwrap();
    let kinds: Vec<_> = events.iter().filter_map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::ApprovalRequested,
            EventKind::ToolCall,
            EventKind::ToolResult,
            EventKind::Terminal
        ]
    );
    // The worker was paused and resumed around the approval.
    let calls = h.worker.calls();
    assert!(calls.contains(&(run.id, "pause")));
    assert!(calls.contains(&(run.id, "resume")));
}

#[tokio::test]
async fn ask_then_deny_blocks_call_and_continues() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(
        task.id,
        vec![
            EventPayload::ToolCall { call: ToolCall::new("c1", "Bash").command("make") },
            terminal(TerminalStatus::Succeeded),
        ],
    );

    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("headless-safe-sandbox"))
        .await
        .unwrap();
    h.wait_for_status(run.id, RunStatus::AwaitingApproval).await;
    assert!(h.runtime.resolve_approval(run.id, "c1", ApprovalDecision::Deny, "alice"));
    h.wait_for_status(run.id, RunStatus::Succeeded).await;

    let events = h.runtime.journal().load_by_run(run.id).unwrap();
    let blocked = events.iter().any(|e| {
        matches!(&e.payload, EventPayload::ToolResult { blocked: true, reason: Some(r), .. } if r == "denied by user")
    });
    assert!(blocked);
}

#[tokio::test]
async fn second_resolve_returns_false() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(
        task.id,
        vec![
            EventPayload::ToolCall { call: ToolCall::new("c1", "Bash").command("ls") },
            terminal(TerminalStatus::Succeeded),
        ],
    );
    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("headless-safe-sandbox"))
        .await
        .unwrap();
    h.wait_for_status(run.id, RunStatus::AwaitingApproval).await;

    assert!(h.runtime.resolve_approval(run.id, "c1", ApprovalDecision::Allow, "alice"));
    assert!(!h.runtime.resolve_approval(run.id, "c1", ApprovalDecision::Allow, "alice"));
}

#[tokio::test]
async fn approval_timeout_fails_run() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(
        task.id,
        vec![EventPayload::ToolCall { call: ToolCall::new("c1", "Bash").command("ls") }],
    );
    // Shrink the approval window for this test only.
    let mut config = h.runtime.config().clone();
    config.approval_timeout_ms = 50;
    let runtime = Runtime::new(
        RuntimeDeps {
            journal: Arc::clone(h.runtime.journal()),
            audit: Arc::clone(h.runtime.audit_log()),
            registry: Arc::clone(h.runtime.registry()),
            approvals: Arc::clone(h.runtime.approvals()),
            broker: Arc::clone(h.runtime.broker()),
            policies: Arc::clone(h.runtime.policies()),
            workers: {
                let mut workers = WorkerRegistry::new();
                workers.register(Arc::new(h.worker.clone()));
                Arc::new(workers)
            },
        },
        config,
        h.clock.clone(),
    );

    let run = runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("headless-safe-sandbox"))
        .await
        .unwrap();
    h.wait_for_status(run.id, RunStatus::Failed).await;
    assert_eq!(h.run(run.id).error.as_deref(), Some("approval_timeout"));
}

#[tokio::test]
async fn cancel_with_cooperative_worker() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    // No terminal in the script: the run stays live until cancelled.
    h.worker.script_task(
        task.id,
        vec![EventPayload::Thought { text: "working".into() }],
    );

    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("full-access"))
        .await
        .unwrap();
    h.wait_until(|| h.runtime.journal().last_seq(run.id) >= 1, "first event journaled").await;

    h.runtime.cancel_run(run.id, "alice").await.unwrap();
    h.wait_for_status(run.id, RunStatus::Cancelled).await;
    assert_eq!(h.runtime.registry().get_agent(agent.id).unwrap().status, AgentStatus::Idle);
}

#[tokio::test]
async fn cancel_grace_synthesizes_terminal() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(task.id, vec![EventPayload::Thought { text: "working".into() }]);
    h.worker.emit_terminal_on_cancel(false);

    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("full-access"))
        .await
        .unwrap();
    h.wait_until(|| h.runtime.journal().last_seq(run.id) >= 1, "first event journaled").await;

    h.runtime.cancel_run(run.id, "alice").await.unwrap();
    h.wait_for_status(run.id, RunStatus::Cancelled).await;

    let last = h.runtime.journal().last_event(run.id).unwrap().unwrap();
    match last.payload {
        EventPayload::Terminal { reason: Some(reason), .. } => {
            assert_eq!(reason, "cancel_grace_elapsed")
        }
        other => panic!("expected synthesized terminal, got {:?}", other),
    }
}

#[tokio::test]
async fn cancel_terminal_run_is_idempotent() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(task.id, read_then_succeed());

    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("full-access"))
        .await
        .unwrap();
    h.wait_for_status(run.id, RunStatus::Succeeded).await;

    let after = h.runtime.cancel_run(run.id, "alice").await.unwrap();
    assert_eq!(after.status, RunStatus::Succeeded);
}

#[tokio::test]
async fn cost_events_fold_into_run() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(
        task.id,
        vec![
            EventPayload::Cost {
                model: "sonnet".into(),
                tokens_in: 120,
                tokens_out: 30,
                cost_usd: 0.02,
            },
            terminal(TerminalStatus::Succeeded),
        ],
    );

    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("full-access"))
        .await
        .unwrap();
    h.wait_for_status(run.id, RunStatus::Succeeded).await;

    let done = h.run(run.id);
    assert_eq!(done.tokens_in, 120);
    assert_eq!(done.tokens_out, 30);
    assert!((done.cost_usd - 0.02).abs() < 1e-9);
    assert_eq!(done.model.as_deref(), Some("sonnet"));
}

#[tokio::test]
async fn delete_agent_with_live_runs_is_rejected() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(task.id, vec![EventPayload::Thought { text: "working".into() }]);

    let run = h
        .runtime
        .start(StartRequest::new(task.id, agent.id).policy_profile("full-access"))
        .await
        .unwrap();
    let err = h.runtime.delete_agent(agent.id).unwrap_err();
    assert_eq!(err.kind(), atc_core::ErrorKind::Conflict);

    h.runtime.cancel_run(run.id, "alice").await.unwrap();
    h.wait_for_status(run.id, RunStatus::Cancelled).await;
    h.runtime.delete_agent(agent.id).unwrap();
    assert_eq!(
        h.runtime.registry().get_agent(agent.id).unwrap().status,
        AgentStatus::Deleted
    );
}
