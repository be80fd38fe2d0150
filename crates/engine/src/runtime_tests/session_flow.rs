// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atc_core::{AgentEvent, EventPayload, SessionKind, SessionStatus};

/// Seed a parent run with `n` thought events appended straight through
/// the journal (the run row is inserted by hand, as rebuilt state
/// would be).
fn seed_parent(h: &Harness, n: u64, checkpoint_at: Option<u64>) -> Run {
    let (task, agent) = h.seed_task_agent("parent");
    let run = Run::builder()
        .task_id(task.id)
        .agent_id(agent.id)
        .project_id(h.project.id)
        .status(RunStatus::Succeeded)
        .ended_at_ms(2_000u64)
        .build();
    h.runtime.registry().insert_run(run.clone());
    h.runtime.journal().create(run.id).unwrap();
    for i in 1..=n {
        let mut event = AgentEvent::new(
            run.id,
            task.id,
            agent.id,
            1_000 + i,
            EventPayload::Thought { text: format!("e{}", i) },
        );
        if checkpoint_at == Some(i) {
            event = event.with_checkpoint();
        }
        h.runtime.journal().append(event).unwrap();
    }
    run
}

#[tokio::test]
async fn fork_preserves_parent() {
    let h = harness();
    let parent = seed_parent(&h, 10, None);
    let events = h.runtime.journal().load_by_run(parent.id).unwrap();
    let cutoff = events[4].id; // seq 5

    let session = h.runtime.fork(parent.id, cutoff, "alice").unwrap();
    assert_eq!(session.kind, SessionKind::Fork);
    assert_eq!(session.event_cutoff_seq, 5);

    let child_events = h.runtime.journal().load_by_run(session.new_run_id).unwrap();
    assert_eq!(child_events.len(), 5);
    assert!(child_events.iter().all(|e| e.run_id == session.new_run_id));

    // Appending to the fork leaves the parent at exactly ten events.
    h.runtime
        .journal()
        .append(AgentEvent::new(
            session.new_run_id,
            parent.task_id,
            parent.agent_id,
            3_000,
            EventPayload::Thought { text: "diverged".into() },
        ))
        .unwrap();
    assert_eq!(h.runtime.journal().load_by_run(parent.id).unwrap().len(), 10);
    assert_eq!(h.run(parent.id).status, RunStatus::Succeeded);
}

#[tokio::test]
async fn fork_unknown_cutoff_is_rejected() {
    let h = harness();
    let parent = seed_parent(&h, 3, None);
    let err = h
        .runtime
        .fork(parent.id, atc_core::EventId::new(), "alice")
        .unwrap_err();
    assert_eq!(err.kind(), atc_core::ErrorKind::Validation);
}

#[tokio::test]
async fn rewind_copies_prefix_without_touching_parent() {
    let h = harness();
    let parent = seed_parent(&h, 8, None);
    let events = h.runtime.journal().load_by_run(parent.id).unwrap();

    let session = h.runtime.rewind(parent.id, events[2].id, "alice").unwrap();
    assert_eq!(session.kind, SessionKind::Rewind);
    assert_eq!(h.runtime.journal().load_by_run(session.new_run_id).unwrap().len(), 3);
    assert_eq!(h.runtime.journal().load_by_run(parent.id).unwrap().len(), 8);
    assert_eq!(session.status, SessionStatus::Created);
}

#[tokio::test]
async fn resume_requires_a_checkpoint() {
    let h = harness();
    let parent = seed_parent(&h, 4, None);
    let err = h.runtime.resume(parent.id, "alice").await.unwrap_err();
    assert_eq!(err.kind(), atc_core::ErrorKind::Validation);
}

#[tokio::test]
async fn resume_dispatches_from_last_checkpoint() {
    let h = harness();
    let parent = seed_parent(&h, 6, Some(4));
    // The parent's task script drives the resumed run to completion.
    h.worker.script_task(parent.task_id, read_then_succeed());

    let session = h.runtime.resume(parent.id, "alice").await.unwrap();
    assert_eq!(session.kind, SessionKind::Resume);
    assert_eq!(session.event_cutoff_seq, 4);
    assert_eq!(session.status, SessionStatus::Dispatched);

    h.wait_for_status(session.new_run_id, RunStatus::Succeeded).await;
    let child_events = h.runtime.journal().load_by_run(session.new_run_id).unwrap();
    // 4 copied + 3 scripted, contiguous seq.
    assert_eq!(child_events.len(), 7);
    let seqs: Vec<u64> = child_events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (1..=7).collect::<Vec<u64>>());
}

#[tokio::test]
async fn replay_requires_checkpoint_flag() {
    let h = harness();
    let parent = seed_parent(&h, 5, Some(2));
    let events = h.runtime.journal().load_by_run(parent.id).unwrap();

    // Event 3 exists but is not flagged.
    let err = h
        .runtime
        .replay(parent.id, events[2].id, "alice")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), atc_core::ErrorKind::Validation);
}

#[tokio::test]
async fn replay_reexecutes_from_checkpoint() {
    let h = harness();
    let parent = seed_parent(&h, 5, Some(2));
    h.worker.script_task(parent.task_id, read_then_succeed());
    let events = h.runtime.journal().load_by_run(parent.id).unwrap();

    let session = h.runtime.replay(parent.id, events[1].id, "alice").await.unwrap();
    assert_eq!(session.kind, SessionKind::Replay);
    h.wait_for_status(session.new_run_id, RunStatus::Succeeded).await;
    assert_eq!(
        h.runtime.journal().load_by_run(session.new_run_id).unwrap().len(),
        5 // 2 copied + 3 scripted
    );
}

#[tokio::test]
async fn sessions_are_recorded_in_registry() {
    let h = harness();
    let parent = seed_parent(&h, 4, None);
    let events = h.runtime.journal().load_by_run(parent.id).unwrap();
    let session = h.runtime.fork(parent.id, events[0].id, "alice").unwrap();

    let stored = h.runtime.registry().get_session(session.id).unwrap();
    assert_eq!(stored.parent_run_id, parent.id);
    assert_eq!(stored.new_run_id, session.new_run_id);
}
