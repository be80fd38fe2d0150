// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atc_core::{ErrorKind, Run};

#[test]
fn error_response_carries_kind() {
    let response = Response::error(ErrorKind::NotFound, "run run-x not found");
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["type"], "error");
    assert_eq!(json["kind"], "not_found");
    let parsed: Response = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, response);
}

#[test]
fn internal_error_is_generic() {
    match Response::internal() {
        Response::Error { kind, message } => {
            assert_eq!(kind, ErrorKind::Internal);
            assert_eq!(message, "internal error");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn run_response_roundtrips() {
    let run = Run::builder().policy_profile("auto-edit").build();
    let response = Response::Run { run: RunDetail::from(&run) };
    let json = serde_json::to_string(&response).unwrap();
    let parsed: Response = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, response);
}

#[test]
fn approval_response_roundtrips() {
    let json = serde_json::to_string(&Response::Approval { consumed: true }).unwrap();
    let parsed: Response = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, Response::Approval { consumed: true });
}
