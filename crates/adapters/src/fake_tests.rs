// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::worker::{DispatchRequest, WorkerAdapter};
use atc_core::{Agent, ContextPack, EventKind, ProjectId, Task, ToolCall};

fn scripted_worker() -> (FakeWorker, Task, Agent) {
    let project_id = ProjectId::new();
    let task = Task::new(project_id, "t", "prompt", 1_000);
    let agent = Agent::new(project_id, "a", "fake");
    let worker = FakeWorker::new();
    worker.script_task(
        task.id,
        vec![
            EventPayload::ToolCall { call: ToolCall::new("c1", "Read").path("main.go") },
            EventPayload::ToolResult {
                call_id: "c1".into(),
                ok: true,
                blocked: false,
                reason: None,
                output: Some("ok".into()),
            },
            EventPayload::Terminal {
                status: TerminalStatus::Succeeded,
                reason: None,
                output: Some("done".into()),
            },
        ],
    );
    (worker, task, agent)
}

fn request(run_id: RunId, task: &Task, agent: &Agent) -> DispatchRequest {
    DispatchRequest {
        run_id,
        task: task.clone(),
        agent: agent.clone(),
        mode: None,
        policy_profile: "full-access".into(),
        context_pack: ContextPack::default(),
    }
}

#[tokio::test]
async fn dispatch_emits_script_in_order() {
    let (worker, task, agent) = scripted_worker();
    let run_id = RunId::new();
    let mut rx = worker.subscribe(run_id);
    worker.dispatch(request(run_id, &task, &agent)).await.unwrap();

    let mut kinds = Vec::new();
    let mut seqs = Vec::new();
    while let Ok(message) = rx.try_recv() {
        kinds.push(message.event.kind());
        seqs.push(message.worker_seq);
        assert_eq!(message.event.run_id, run_id);
        assert_eq!(message.event.task_id, task.id);
    }
    assert_eq!(
        kinds,
        vec![
            Some(EventKind::ToolCall),
            Some(EventKind::ToolResult),
            Some(EventKind::Terminal)
        ]
    );
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[tokio::test]
async fn duplicate_seqs_repeats_each_message() {
    let (worker, task, agent) = scripted_worker();
    worker.duplicate_seqs(true);
    let run_id = RunId::new();
    let mut rx = worker.subscribe(run_id);
    worker.dispatch(request(run_id, &task, &agent)).await.unwrap();

    let mut seqs = Vec::new();
    while let Ok(message) = rx.try_recv() {
        seqs.push(message.worker_seq);
    }
    assert_eq!(seqs, vec![1, 1, 2, 2, 3, 3]);
}

#[tokio::test]
async fn cancel_emits_cancelled_terminal() {
    let project_id = ProjectId::new();
    let task = Task::new(project_id, "t", "p", 1_000);
    let agent = Agent::new(project_id, "a", "fake");
    let worker = FakeWorker::new();
    worker.script_task(task.id, vec![EventPayload::Thought { text: "working".into() }]);

    let run_id = RunId::new();
    let mut rx = worker.subscribe(run_id);
    worker.dispatch(request(run_id, &task, &agent)).await.unwrap();
    worker.cancel(run_id).await.unwrap();

    let mut last = None;
    while let Ok(message) = rx.try_recv() {
        last = Some(message);
    }
    let last = last.unwrap();
    assert!(last.event.is_terminal());
    assert_eq!(last.worker_seq, 2);
}

#[tokio::test]
async fn cancel_without_terminal_when_disabled() {
    let (worker, task, agent) = scripted_worker();
    worker.emit_terminal_on_cancel(false);
    let run_id = RunId::new();
    let _rx = worker.subscribe(run_id);
    worker.dispatch(request(run_id, &task, &agent)).await.unwrap();
    worker.cancel(run_id).await.unwrap();
    assert_eq!(worker.calls(), vec![(run_id, "cancel")]);
}

#[tokio::test]
async fn pause_and_resume_are_recorded() {
    let worker = FakeWorker::new();
    let run_id = RunId::new();
    worker.pause(run_id).await.unwrap();
    worker.resume(run_id).await.unwrap();
    assert_eq!(worker.calls(), vec![(run_id, "pause"), (run_id, "resume")]);
}

#[tokio::test]
async fn emit_injects_mid_run_events() {
    let (worker, task, agent) = scripted_worker();
    let run_id = RunId::new();
    let mut rx = worker.subscribe(run_id);
    worker.dispatch(request(run_id, &task, &agent)).await.unwrap();
    worker.emit(run_id, EventPayload::Thought { text: "extra".into() });

    let mut count = 0;
    while rx.try_recv().is_ok() {
        count += 1;
    }
    assert_eq!(count, 4);
}
