// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atc_core::{AgentEvent, AgentId, EventPayload, RunId, TaskId};

fn event(seq: u64, payload: EventPayload) -> AgentEvent {
    let mut ev = AgentEvent::new(RunId::new(), TaskId::new(), AgentId::new(), 1_000, payload);
    ev.seq = seq;
    ev
}

#[test]
fn cursor_roundtrip() {
    let cursor = Cursor::encode(42, "evt-abc");
    assert_eq!(cursor.to_string(), "42:evt-abc");
    assert_eq!(cursor.decode(), Some((42, "evt-abc")));
}

#[yare::parameterized(
    empty      = { "" },
    no_colon   = { "42" },
    bad_seq    = { "x:evt-abc" },
)]
fn malformed_cursors_decode_to_none(raw: &str) {
    assert_eq!(Cursor(raw.to_string()).decode(), None);
}

#[test]
fn cursor_with_colons_in_id_still_decodes() {
    // split_once: everything after the first colon is the id.
    let cursor = Cursor("7:evt:odd".to_string());
    assert_eq!(cursor.decode(), Some((7, "evt:odd")));
}

#[test]
fn empty_filter_matches_everything() {
    let filter = TrajectoryFilter::default();
    assert!(filter.matches(&event(1, EventPayload::Thought { text: "x".into() })));
}

#[test]
fn type_filter_restricts_kinds() {
    let filter = TrajectoryFilter::types(vec![atc_core::EventKind::ToolCall]);
    assert!(filter.matches(&event(
        1,
        EventPayload::ToolCall { call: atc_core::ToolCall::new("c", "Read") }
    )));
    assert!(!filter.matches(&event(2, EventPayload::Thought { text: "x".into() })));
}

#[test]
fn since_seq_is_exclusive() {
    let filter = TrajectoryFilter { since_seq: Some(5), ..TrajectoryFilter::default() };
    assert!(!filter.matches(&event(5, EventPayload::Thought { text: "x".into() })));
    assert!(filter.matches(&event(6, EventPayload::Thought { text: "x".into() })));
}

#[test]
fn checkpoints_only_requires_flag() {
    let filter = TrajectoryFilter { checkpoints_only: true, ..TrajectoryFilter::default() };
    let plain = event(1, EventPayload::Thought { text: "x".into() });
    assert!(!filter.matches(&plain));
    assert!(filter.matches(&plain.with_checkpoint()));
}
