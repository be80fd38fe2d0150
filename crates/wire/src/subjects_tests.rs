// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atc_core::{AgentEvent, AgentId, EventPayload, TaskId};

#[test]
fn subjects_are_per_run() {
    let run_id = RunId::from_string("run-abc");
    assert_eq!(dispatch_subject(run_id), "dispatch.run-abc");
    assert_eq!(cancel_subject(run_id), "cancel.run-abc");
    assert_eq!(events_subject(run_id), "events.run-abc");
}

#[test]
fn event_message_roundtrips() {
    let run_id = RunId::new();
    let message = WorkerMessage::Event {
        run_id,
        worker_seq: 7,
        event: AgentEvent::new(
            run_id,
            TaskId::new(),
            AgentId::new(),
            1_000,
            EventPayload::Thought { text: "x".into() },
        ),
    };
    let json = serde_json::to_string(&message).unwrap();
    let parsed: WorkerMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, message);
}

#[test]
fn cancel_message_tag() {
    let json = serde_json::to_value(WorkerMessage::Cancel { run_id: RunId::from_string("run-1") })
        .unwrap();
    assert_eq!(json["type"], "cancel");
}
