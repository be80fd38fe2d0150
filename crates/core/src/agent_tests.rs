// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    idle    = { AgentStatus::Idle, true },
    busy    = { AgentStatus::Busy, false },
    error   = { AgentStatus::Error, false },
    deleted = { AgentStatus::Deleted, false },
)]
fn only_idle_is_dispatchable(status: AgentStatus, expected: bool) {
    assert_eq!(status.is_dispatchable(), expected);
}

#[test]
fn new_agent_starts_idle() {
    let agent = Agent::new(ProjectId::new(), "reviewer", "claude-code");
    assert_eq!(agent.status, AgentStatus::Idle);
    assert_eq!(agent.backend_kind, "claude-code");
    assert!(agent.id.as_str().starts_with("agt-"));
}

#[test]
fn limits_default_to_unbounded_no_net() {
    let limits = ResourceLimits::default();
    assert_eq!(limits.cpu_millis, None);
    assert_eq!(limits.mem_mb, None);
    assert!(!limits.net);
}

#[test]
fn agent_serde_roundtrip() {
    let mut agent = Agent::builder().name("coder").backend_kind("headless").build();
    agent.limits.mem_mb = Some(2048);
    let json = serde_json::to_string(&agent).unwrap();
    let parsed: Agent = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.name, "coder");
    assert_eq!(parsed.limits.mem_mb, Some(2048));
}
