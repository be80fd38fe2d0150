// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fake::FakeWorker;

#[test]
fn registry_resolves_by_kind() {
    let mut registry = WorkerRegistry::new();
    registry.register(Arc::new(FakeWorker::new()));
    assert!(registry.get("fake").is_ok());
    assert_eq!(registry.kinds(), vec!["fake"]);
}

#[test]
fn registry_unknown_backend_errors() {
    let registry = WorkerRegistry::new();
    let err = registry.get("missing").unwrap_err();
    assert!(matches!(err, WorkerError::UnknownBackend(_)));
    assert_eq!(err.kind(), atc_core::ErrorKind::Validation);
}

#[yare::parameterized(
    ack_timeout = { WorkerError::AckTimeout, atc_core::ErrorKind::Timeout },
    unavailable = { WorkerError::Unavailable("x".into()), atc_core::ErrorKind::DependencyUnavailable },
    closed      = { WorkerError::StreamClosed(RunId::new()), atc_core::ErrorKind::DependencyUnavailable },
)]
fn error_kinds(err: WorkerError, kind: atc_core::ErrorKind) {
    assert_eq!(err.kind(), kind);
}

#[test]
fn worker_event_serde_roundtrip() {
    let event = AgentEvent::new(
        RunId::new(),
        atc_core::TaskId::new(),
        atc_core::AgentId::new(),
        1_000,
        atc_core::EventPayload::Thought { text: "x".into() },
    );
    let message = WorkerEvent { worker_seq: 3, event };
    let json = serde_json::to_string(&message).unwrap();
    let parsed: WorkerEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, message);
}
