// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::profile::{Decision, PermissionRule, PolicyMode, PolicyProfile, Specifier};

fn custom(name: &str) -> PolicyProfile {
    PolicyProfile::new(name, PolicyMode::Default)
        .rule(PermissionRule::new(Specifier::tool("Read"), Decision::Allow))
}

fn open_store() -> (tempfile::TempDir, ProfileStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ProfileStore::open(dir.path().join("policies")).unwrap();
    (dir, store)
}

#[test]
fn put_then_get_roundtrips() {
    let (_dir, store) = open_store();
    store.put(&custom("mine")).unwrap();
    let compiled = store.get("mine").unwrap();
    assert_eq!(compiled.name(), "mine");
    assert_eq!(compiled.profile().rules.len(), 1);
}

#[test]
fn get_resolves_presets_without_files() {
    let (_dir, store) = open_store();
    let compiled = store.get("plan-readonly").unwrap();
    assert_eq!(compiled.name(), "plan-readonly");
}

#[test]
fn get_unknown_profile_is_not_found() {
    let (_dir, store) = open_store();
    assert!(matches!(store.get("ghost"), Err(StoreError::NotFound(_))));
}

#[test]
fn put_preset_name_is_rejected() {
    let (_dir, store) = open_store();
    let err = store.put(&custom("full-access")).unwrap_err();
    assert!(matches!(err, StoreError::PresetMutation(_)));
}

#[test]
fn delete_preset_is_rejected() {
    let (_dir, store) = open_store();
    assert!(matches!(store.delete("auto-edit"), Err(StoreError::PresetMutation(_))));
}

#[test]
fn delete_is_idempotent() {
    let (_dir, store) = open_store();
    store.put(&custom("mine")).unwrap();
    assert!(store.delete("mine").unwrap());
    assert!(!store.delete("mine").unwrap());
}

#[test]
fn put_invalidates_cache() {
    let (_dir, store) = open_store();
    store.put(&custom("mine")).unwrap();
    let before = store.get("mine").unwrap();
    assert_eq!(before.profile().mode, PolicyMode::Default);

    let mut updated = custom("mine");
    updated.mode = PolicyMode::Strict;
    store.put(&updated).unwrap();

    let after = store.get("mine").unwrap();
    assert_eq!(after.profile().mode, PolicyMode::Strict);
}

#[test]
fn list_returns_presets_then_sorted_custom() {
    let (_dir, store) = open_store();
    store.put(&custom("zeta")).unwrap();
    store.put(&custom("alpha")).unwrap();
    let names = store.list().unwrap();
    assert_eq!(
        names,
        vec!["plan-readonly", "headless-safe-sandbox", "auto-edit", "full-access", "alpha", "zeta"]
    );
}

#[yare::parameterized(
    empty       = { "" },
    slash       = { "a/b" },
    backslash   = { "a\\b" },
    dotfile     = { ".hidden" },
)]
fn invalid_names_rejected(name: &str) {
    let (_dir, store) = open_store();
    assert!(matches!(store.get(name), Err(StoreError::InvalidName(_))));
}

#[test]
fn malformed_file_reports_malformed() {
    let (_dir, store) = open_store();
    std::fs::write(store_path(&store, "broken"), "{not json").unwrap();
    assert!(matches!(store.get("broken"), Err(StoreError::Malformed { .. })));
}

fn store_path(store: &ProfileStore, name: &str) -> std::path::PathBuf {
    // Mirror of the store's naming scheme for test fixtures.
    store_dir(store).join(format!("{}.json", name))
}

fn store_dir(store: &ProfileStore) -> std::path::PathBuf {
    store.dir.clone()
}
