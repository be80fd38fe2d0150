// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atc_core::{AuditEntry, AuditOutcome};
use tempfile::tempdir;

fn open_log() -> (tempfile::TempDir, AuditLog) {
    let dir = tempdir().unwrap();
    let log = AuditLog::open(dir.path().join("audit.jsonl")).unwrap();
    (dir, log)
}

fn entry(actor: &str, action: &str) -> AuditEntry {
    AuditEntry::new(actor, action, AuditOutcome::Ok, 1_000)
}

#[test]
fn append_and_page_roundtrip() {
    let (_dir, log) = open_log();
    log.append(&entry("alice", "run.start")).unwrap();
    log.append(&entry("bob", "run.cancel")).unwrap();

    let page = log.page(&AuditFilter::default(), None, 10, 100).unwrap();
    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.total, 2);
    assert!(!page.has_more);
    assert_eq!(page.entries[0].actor, "alice");
}

#[test]
fn pagination_with_cursor() {
    let (_dir, log) = open_log();
    for i in 0..5 {
        log.append(&entry("alice", &format!("action.{}", i))).unwrap();
    }

    let first = log.page(&AuditFilter::default(), None, 2, 100).unwrap();
    assert_eq!(first.entries.len(), 2);
    assert!(first.has_more);

    let second = log
        .page(&AuditFilter::default(), first.cursor.as_ref(), 2, 100)
        .unwrap();
    assert_eq!(second.entries[0].action, "action.2");
}

#[test]
fn actor_filter_applied_before_pagination() {
    let (_dir, log) = open_log();
    for i in 0..4 {
        let actor = if i % 2 == 0 { "alice" } else { "bob" };
        log.append(&entry(actor, "act")).unwrap();
    }
    let filter = AuditFilter { actor: Some("bob".into()), ..AuditFilter::default() };
    let page = log.page(&filter, None, 10, 100).unwrap();
    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.total, 2);
    assert!(page.entries.iter().all(|e| e.actor == "bob"));
}

#[test]
fn run_filter_matches_ids() {
    let (_dir, log) = open_log();
    let run = atc_core::RunId::new();
    log.append(&entry("alice", "a").run_id(run)).unwrap();
    log.append(&entry("alice", "b")).unwrap();

    let filter = AuditFilter { run_id: Some(run), ..AuditFilter::default() };
    let page = log.page(&filter, None, 10, 100).unwrap();
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].action, "a");
}

#[test]
fn limit_clamped_to_cap() {
    let (_dir, log) = open_log();
    for _ in 0..6 {
        log.append(&entry("alice", "act")).unwrap();
    }
    let page = log.page(&AuditFilter::default(), None, 1000, 3).unwrap();
    assert_eq!(page.entries.len(), 3);
    assert!(page.has_more);
}

#[test]
fn reopen_continues_appending() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    {
        let log = AuditLog::open(&path).unwrap();
        log.append(&entry("alice", "one")).unwrap();
    }
    let log = AuditLog::open(&path).unwrap();
    log.append(&entry("alice", "two")).unwrap();
    let page = log.page(&AuditFilter::default(), None, 10, 100).unwrap();
    assert_eq!(page.entries.len(), 2);
}
