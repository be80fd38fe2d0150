// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn lines_append_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = ActivityLog::new(dir.path().join("activity"));
    let run_id = RunId::new();

    log.append(run_id, 1_000, "tool_call Read");
    log.append(run_id, 1_001, "tool_result c1 ok=true");

    let text = log.read(run_id).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["[1000] tool_call Read", "[1001] tool_result c1 ok=true"]);
}

#[test]
fn runs_get_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let log = ActivityLog::new(dir.path().join("activity"));
    let a = RunId::new();
    let b = RunId::new();
    log.append(a, 1, "a");
    log.append(b, 2, "b");
    assert_eq!(log.read(a).unwrap().trim(), "[1] a");
    assert_eq!(log.read(b).unwrap().trim(), "[2] b");
}

#[test]
fn read_missing_run_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let log = ActivityLog::new(dir.path().join("activity"));
    assert!(log.read(RunId::new()).is_none());
}
