// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    default_mode = { PolicyMode::Default, Decision::Deny },
    strict_mode  = { PolicyMode::Strict, Decision::Deny },
    audit_mode   = { PolicyMode::Audit, Decision::Ask },
)]
fn default_decision_follows_mode(mode: PolicyMode, expected: Decision) {
    let profile = PolicyProfile::new("p", mode);
    assert_eq!(profile.default_decision(), expected);
}

#[test]
fn empty_specifier_is_catch_all() {
    assert!(Specifier::default().is_catch_all());
    assert!(!Specifier::tool("Bash").is_catch_all());
    assert!(!Specifier::default().path("src/**").is_catch_all());
}

#[test]
fn clone_as_renames_only() {
    let preset = PolicyProfile::new("origin", PolicyMode::Strict)
        .rule(PermissionRule::new(Specifier::tool("Read"), Decision::Allow));
    let clone = preset.clone_as("mine");
    assert_eq!(clone.name, "mine");
    assert_eq!(clone.mode, PolicyMode::Strict);
    assert_eq!(clone.rules, preset.rules);
}

#[test]
fn rule_serde_flattens_specifier() {
    let rule = PermissionRule::new(
        Specifier::tool("Bash").command("rm *"),
        Decision::Deny,
    )
    .terminating();
    let json = serde_json::to_value(&rule).unwrap();
    assert_eq!(json["tool"], "Bash");
    assert_eq!(json["command"], "rm *");
    assert_eq!(json["decision"], "deny");
    assert_eq!(json["on_deny_terminate"], true);
    let parsed: PermissionRule = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, rule);
}

#[test]
fn profile_serde_roundtrip() {
    let profile = PolicyProfile::new("custom", PolicyMode::Audit)
        .rule(PermissionRule::new(Specifier::tool("Read"), Decision::Allow))
        .gate(GateRule::new("Edit", vec![GateCheck::RequirePath, GateCheck::PathUnder("/src".into())]))
        .termination(Termination {
            max_steps: Some(10),
            max_cost_usd: None,
            max_wall_ms: None,
            deny_terminates: true,
        });
    let json = serde_json::to_string(&profile).unwrap();
    let parsed: PolicyProfile = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, profile);
}
