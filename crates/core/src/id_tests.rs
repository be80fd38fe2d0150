// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

crate::define_id! {
    /// Test-only ID type.
    pub struct TestId("tst-");
}

#[test]
fn generated_ids_have_prefix_and_fixed_length() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn generated_ids_are_unique() {
    let a = TestId::new();
    let b = TestId::new();
    assert_ne!(a, b);
}

#[test]
fn from_string_roundtrips() {
    let id = TestId::from_string("tst-abc");
    assert_eq!(id.as_str(), "tst-abc");
    assert_eq!(id.suffix(), "abc");
}

#[test]
fn short_truncates_suffix() {
    let id = TestId::from_string("tst-abcdefgh");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdefgh");
}

#[test]
fn serde_is_transparent() {
    let id = TestId::from_string("tst-xyz");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"tst-xyz\"");
    let parsed: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn deserialize_rejects_oversized() {
    let long = format!("\"{}\"", "x".repeat(ID_MAX_LEN + 1));
    assert!(serde_json::from_str::<TestId>(&long).is_err());
}

#[test]
fn idbuf_hash_matches_str_for_map_lookup() {
    let mut map: HashMap<IdBuf, u32> = HashMap::new();
    map.insert(IdBuf::new("run-1"), 7);
    assert_eq!(map.get("run-1"), Some(&7));
}

#[yare::parameterized(
    shorter = { "abc", 2, "ab" },
    exact   = { "abc", 3, "abc" },
    longer  = { "abc", 9, "abc" },
)]
fn short_fn(s: &str, n: usize, expected: &str) {
    assert_eq!(short(s, n), expected);
}

#[test]
fn find_by_prefix_full_match() {
    let mut map = HashMap::new();
    map.insert("run-abc".to_string(), 1);
    map.insert("run-abd".to_string(), 2);
    assert_eq!(find_by_prefix(&map, "run-abc"), Some(&1));
}

#[test]
fn find_by_prefix_unique_prefix() {
    let mut map = HashMap::new();
    map.insert("run-abc".to_string(), 1);
    map.insert("run-xyz".to_string(), 2);
    assert_eq!(find_by_prefix(&map, "run-x"), Some(&2));
}

#[test]
fn find_by_prefix_ambiguous_returns_none() {
    let mut map = HashMap::new();
    map.insert("run-abc".to_string(), 1);
    map.insert("run-abd".to_string(), 2);
    assert_eq!(find_by_prefix(&map, "run-ab"), None);
}

#[test]
fn find_by_prefix_missing_returns_none() {
    let map: HashMap<String, u32> = HashMap::new();
    assert_eq!(find_by_prefix(&map, "run-a"), None);
}
