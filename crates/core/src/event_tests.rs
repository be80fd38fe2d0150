// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn event(payload: EventPayload) -> AgentEvent {
    AgentEvent::new(RunId::new(), TaskId::new(), AgentId::new(), 1_000, payload)
}

#[test]
fn payload_serializes_with_type_tag() {
    let payload = EventPayload::ToolCall {
        call: ToolCall::new("call-1", "Read").path("main.go"),
    };
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["type"], "tool_call");
    assert_eq!(json["tool"], "Read");
    assert_eq!(json["call_id"], "call-1");
    assert_eq!(json["path"], "main.go");
}

#[test]
fn unknown_type_tag_deserializes_to_custom() {
    let parsed: EventPayload =
        serde_json::from_str(r#"{"type": "future_thing", "x": 1}"#).unwrap();
    assert_eq!(parsed, EventPayload::Custom);
    assert_eq!(parsed.kind(), None);
}

#[yare::parameterized(
    thought    = { EventPayload::Thought { text: "hmm".into() }, EventKind::Thought },
    tool_call  = { EventPayload::ToolCall { call: ToolCall::new("c", "Bash") }, EventKind::ToolCall },
    message    = { EventPayload::Message { text: "hi".into(), accepted: false, substeps: vec![] }, EventKind::Message },
    checkpoint = { EventPayload::Checkpoint { label: None }, EventKind::Checkpoint },
    cost       = { EventPayload::Cost { model: "m".into(), tokens_in: 1, tokens_out: 2, cost_usd: 0.1 }, EventKind::Cost },
    terminal   = { EventPayload::Terminal { status: TerminalStatus::Succeeded, reason: None, output: None }, EventKind::Terminal },
)]
fn payload_kinds(payload: EventPayload, kind: EventKind) {
    assert_eq!(payload.kind(), Some(kind));
}

#[test]
fn tool_result_links_parent() {
    let call = event(EventPayload::ToolCall { call: ToolCall::new("call-1", "Read") });
    let result = event(EventPayload::ToolResult {
        call_id: "call-1".into(),
        ok: true,
        blocked: false,
        reason: None,
        output: Some("fn main() {}".into()),
    })
    .with_parent(call.id);
    assert_eq!(result.parent_event_id, Some(call.id));
}

#[test]
fn checkpoint_payload_sets_flag() {
    let ev = event(EventPayload::Checkpoint { label: Some("after-build".into()) });
    assert!(ev.checkpoint);
}

#[test]
fn non_checkpoint_payload_can_be_flagged() {
    let ev = event(EventPayload::Message {
        text: "midpoint".into(),
        accepted: false,
        substeps: vec![],
    });
    assert!(!ev.checkpoint);
    assert!(ev.with_checkpoint().checkpoint);
}

#[test]
fn terminal_detection() {
    let ev = event(EventPayload::Terminal {
        status: TerminalStatus::Failed,
        reason: Some("policy_deny".into()),
        output: None,
    });
    assert!(ev.is_terminal());
    assert!(!event(EventPayload::Thought { text: "x".into() }).is_terminal());
}

#[test]
fn event_serde_roundtrip_flattens_payload() {
    let ev = event(EventPayload::Cost {
        model: "sonnet".into(),
        tokens_in: 100,
        tokens_out: 50,
        cost_usd: 0.0123,
    });
    let json = serde_json::to_value(&ev).unwrap();
    assert_eq!(json["type"], "cost");
    assert_eq!(json["model"], "sonnet");
    let parsed: AgentEvent = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, ev);
}

#[test]
fn message_with_substeps_roundtrips() {
    let ev = event(EventPayload::Message {
        text: "splitting work".into(),
        accepted: false,
        substeps: vec![SubstepSpec {
            task_id: TaskId::from_string("tsk-sub1"),
            agent_id: AgentId::from_string("agt-sub1"),
            policy_profile: None,
            depends_on: vec![],
        }],
    });
    let json = serde_json::to_string(&ev).unwrap();
    let parsed: AgentEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, ev);
}

#[test]
fn blocked_flag_omitted_when_false() {
    let json = serde_json::to_string(&EventPayload::ToolResult {
        call_id: "c".into(),
        ok: true,
        blocked: false,
        reason: None,
        output: None,
    })
    .unwrap();
    assert!(!json.contains("blocked"));
}
