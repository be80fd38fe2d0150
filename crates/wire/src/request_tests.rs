// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atc_core::EventKind;

#[test]
fn run_start_tagged_and_minimal() {
    let request = Request::RunStart {
        task_id: TaskId::from_string("tsk-1"),
        agent_id: AgentId::from_string("agt-1"),
        policy_profile: None,
        mode: None,
        idempotency_key: None,
        context_pack: ContextPack::default(),
    };
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["type"], "run:start");
    // Unset options do not appear on the wire.
    assert!(json.get("policy_profile").is_none());
    assert!(json.get("context_pack").is_none());
}

#[test]
fn trajectory_roundtrips_with_filter() {
    let request = Request::Trajectory {
        run_id: RunId::from_string("run-1"),
        types: vec![EventKind::ToolCall, EventKind::Terminal],
        cursor: Some("5:evt-x".into()),
        limit: Some(50),
    };
    let json = serde_json::to_string(&request).unwrap();
    let parsed: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, request);
}

#[test]
fn plan_create_roundtrips() {
    let request = Request::PlanCreate {
        project_id: atc_core::ProjectId::from_string("prj-1"),
        name: "release".into(),
        protocol: Protocol::PingPong,
        max_parallel: Some(2),
        max_rounds: Some(3),
        failure_policy: FailurePolicy::Strict,
        steps: vec![PlanStepRequest {
            task_id: TaskId::from_string("tsk-1"),
            agent_id: AgentId::from_string("agt-1"),
            policy_profile: Some("auto-edit".into()),
            depends_on: vec![],
            deliver_mode: DeliverMode::Context,
        }],
    };
    let json = serde_json::to_string(&request).unwrap();
    let parsed: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, request);
}

#[yare::parameterized(
    ping      = { Request::Ping, "ping" },
    shutdown  = { Request::Shutdown, "system:shutdown" },
    plan_get  = { Request::PlanGet { plan_id: PlanId::from_string("pln-1") }, "plan:get" },
    subscribe = { Request::Subscribe { run_id: RunId::from_string("run-1"), since_seq: None }, "run:subscribe" },
)]
fn type_tags(request: Request, tag: &str) {
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["type"], tag);
}

#[test]
fn unknown_request_type_fails_to_parse() {
    assert!(serde_json::from_str::<Request>(r#"{"type": "no:such"}"#).is_err());
}
