// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn layout_derives_from_state_dir() {
    let config = Config {
        state_dir: "/var/lib/atc".into(),
        log_dir: "/var/log/atc".into(),
        ..Config::default()
    };
    let paths = Paths::from_config(&config);
    assert_eq!(paths.lock_file, PathBuf::from("/var/lib/atc/atcd.lock"));
    assert_eq!(paths.journal_dir, PathBuf::from("/var/lib/atc/journal"));
    assert_eq!(paths.audit_file, PathBuf::from("/var/lib/atc/audit.jsonl"));
    assert_eq!(paths.policies_dir, PathBuf::from("/var/lib/atc/policies"));
    assert_eq!(paths.snapshot_file, PathBuf::from("/var/lib/atc/registry.snap"));
    assert_eq!(paths.log_dir, PathBuf::from("/var/log/atc"));
}
