// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    validation        = { ErrorKind::Validation, "validation" },
    not_found         = { ErrorKind::NotFound, "not_found" },
    conflict          = { ErrorKind::Conflict, "conflict" },
    forbidden         = { ErrorKind::Forbidden, "forbidden" },
    unauthenticated   = { ErrorKind::Unauthenticated, "unauthenticated" },
    dependency        = { ErrorKind::DependencyUnavailable, "dependency_unavailable" },
    timeout           = { ErrorKind::Timeout, "timeout" },
    policy_deny       = { ErrorKind::PolicyDeny, "policy_deny" },
    approval_timeout  = { ErrorKind::ApprovalTimeout, "approval_timeout" },
    approval_lost     = { ErrorKind::ApprovalLost, "approval_lost" },
    process_restart   = { ErrorKind::ProcessRestart, "process_restart" },
    internal          = { ErrorKind::Internal, "internal" },
)]
fn display_and_serde_agree(kind: ErrorKind, expected: &str) {
    assert_eq!(kind.to_string(), expected);
    let json = serde_json::to_string(&kind).unwrap();
    assert_eq!(json, format!("\"{}\"", expected));
    let parsed: ErrorKind = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, kind);
}

#[test]
fn internal_and_dependency_are_not_domain() {
    assert!(!ErrorKind::Internal.is_domain());
    assert!(!ErrorKind::DependencyUnavailable.is_domain());
    assert!(ErrorKind::Conflict.is_domain());
}

#[test]
fn core_error_display() {
    let err = CoreError::not_found("run", "run-abc");
    assert_eq!(err.to_string(), "not_found: run run-abc not found");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn core_error_serde_roundtrip() {
    let err = CoreError::conflict("idempotency key reused");
    let json = serde_json::to_string(&err).unwrap();
    let parsed: CoreError = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, err);
}
