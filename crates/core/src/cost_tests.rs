// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn add_folds_totals_and_per_model() {
    let mut summary = CostSummary::default();
    summary.add("sonnet", 100, 40, 0.01);
    summary.add("sonnet", 50, 10, 0.005);
    summary.add("haiku", 10, 5, 0.001);

    assert_eq!(summary.tokens_in, 160);
    assert_eq!(summary.tokens_out, 55);
    assert!((summary.cost_usd - 0.016).abs() < 1e-9);
    assert_eq!(summary.by_model.len(), 2);
    assert_eq!(summary.by_model["sonnet"].tokens_in, 150);
    assert_eq!(summary.by_model["haiku"].tokens_out, 5);
}

#[test]
fn merge_combines_summaries() {
    let mut a = CostSummary::default();
    a.add("sonnet", 100, 40, 0.01);
    let mut b = CostSummary::default();
    b.add("sonnet", 10, 4, 0.001);
    b.add("opus", 1, 1, 0.01);

    a.merge(&b);
    assert_eq!(a.tokens_in, 111);
    assert_eq!(a.by_model["sonnet"].tokens_in, 110);
    assert_eq!(a.by_model["opus"].tokens_in, 1);
}

#[test]
fn empty_detection() {
    let mut summary = CostSummary::default();
    assert!(summary.is_empty());
    summary.add("m", 0, 0, 0.0);
    assert!(summary.is_empty());
    summary.add("m", 1, 0, 0.0);
    assert!(!summary.is_empty());
}

#[test]
fn serde_roundtrip() {
    let mut summary = CostSummary::default();
    summary.add("sonnet", 5, 2, 0.0005);
    let json = serde_json::to_string(&summary).unwrap();
    let parsed: CostSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, summary);
}
