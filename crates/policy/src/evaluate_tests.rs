// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::profile::{
    GateCheck, GateRule, PermissionRule, PolicyMode, PolicyProfile, Specifier, Termination,
};
use atc_core::ToolCall;
use proptest::prelude::*;

fn profile() -> PolicyProfile {
    PolicyProfile::new("test", PolicyMode::Default)
        .rule(PermissionRule::new(Specifier::tool("Read"), Decision::Allow))
        .rule(PermissionRule::new(
            Specifier::tool("Bash").command("git status*"),
            Decision::Allow,
        ))
        .rule(PermissionRule::new(Specifier::tool("Bash"), Decision::Ask))
        .rule(PermissionRule::new(Specifier::tool("Delete"), Decision::Deny).terminating())
}

fn ctx() -> EvalContext {
    EvalContext::default()
}

#[test]
fn first_matching_rule_wins() {
    let compiled = CompiledProfile::new(profile());
    let eval = compiled.evaluate(&ToolCall::new("c1", "Read"), &ctx());
    assert_eq!(eval.decision, Decision::Allow);
    assert_eq!(eval.matched_rule, Some(0));
}

#[test]
fn command_glob_narrows_before_bare_tool_rule() {
    let compiled = CompiledProfile::new(profile());

    let status = ToolCall::new("c1", "Bash").command("git status --short");
    let eval = compiled.evaluate(&status, &ctx());
    assert_eq!(eval.decision, Decision::Allow);
    assert_eq!(eval.matched_rule, Some(1));

    let push = ToolCall::new("c2", "Bash").command("git push");
    let eval = compiled.evaluate(&push, &ctx());
    assert_eq!(eval.decision, Decision::Ask);
    assert_eq!(eval.matched_rule, Some(2));
}

#[test]
fn unmatched_tool_gets_profile_default() {
    let compiled = CompiledProfile::new(profile());
    let eval = compiled.evaluate(&ToolCall::new("c1", "WebFetch"), &ctx());
    assert_eq!(eval.decision, Decision::Deny);
    assert_eq!(eval.matched_rule, None);
}

#[test]
fn audit_profile_defaults_to_ask() {
    let profile = PolicyProfile::new("audit", PolicyMode::Audit);
    let eval = evaluate(&profile, &ToolCall::new("c1", "Anything"), &ctx());
    assert_eq!(eval.decision, Decision::Ask);
}

#[test]
fn deny_rule_carries_termination_flag() {
    let compiled = CompiledProfile::new(profile());
    let eval = compiled.evaluate(&ToolCall::new("c1", "Delete").path("/"), &ctx());
    assert_eq!(eval.decision, Decision::Deny);
    assert!(eval.deny_terminates);
}

#[yare::parameterized(
    steps = { Termination { max_steps: Some(5), ..Termination::default() }, EvalContext { step_count: 5, ..EvalContext::default() }, "max_steps" },
    cost  = { Termination { max_cost_usd: Some(1.0), ..Termination::default() }, EvalContext { cost_usd: 1.5, ..EvalContext::default() }, "max_cost_usd" },
    wall  = { Termination { max_wall_ms: Some(1000), ..Termination::default() }, EvalContext { elapsed_ms: 1000, ..EvalContext::default() }, "max_wall_ms" },
)]
fn termination_limits_deny_before_rules(term: Termination, ctx: EvalContext, limit: &str) {
    // Even an allow-everything profile is overridden by termination.
    let profile = PolicyProfile::new("t", PolicyMode::Default)
        .rule(PermissionRule::new(Specifier::default(), Decision::Allow))
        .termination(term);
    let eval = evaluate(&profile, &ToolCall::new("c1", "Read"), &ctx);
    assert_eq!(eval.decision, Decision::Deny);
    assert!(eval.deny_terminates);
    assert!(eval.reason.contains("terminated"));
    assert!(eval.reason.contains(limit));
}

#[test]
fn termination_below_limit_passes_through() {
    let profile = PolicyProfile::new("t", PolicyMode::Default)
        .rule(PermissionRule::new(Specifier::default(), Decision::Allow))
        .termination(Termination { max_steps: Some(5), ..Termination::default() });
    let ctx = EvalContext { step_count: 4, ..EvalContext::default() };
    let eval = evaluate(&profile, &ToolCall::new("c1", "Read"), &ctx);
    assert_eq!(eval.decision, Decision::Allow);
}

#[test]
fn gate_failure_asks_by_default() {
    let profile = PolicyProfile::new("g", PolicyMode::Default)
        .rule(PermissionRule::new(Specifier::tool("Edit"), Decision::Allow))
        .gate(GateRule::new("Edit", vec![GateCheck::RequirePath]));
    let eval = evaluate(&profile, &ToolCall::new("c1", "Edit"), &ctx());
    assert_eq!(eval.decision, Decision::Ask);
    assert!(eval.reason.starts_with("quality gate"));
}

#[test]
fn gate_failure_denies_under_strict() {
    let profile = PolicyProfile::new("g", PolicyMode::Strict)
        .rule(PermissionRule::new(Specifier::tool("Edit"), Decision::Allow))
        .gate(GateRule::new("Edit", vec![GateCheck::RequirePath]));
    let eval = evaluate(&profile, &ToolCall::new("c1", "Edit"), &ctx());
    assert_eq!(eval.decision, Decision::Deny);
}

#[test]
fn gate_passes_when_precondition_holds() {
    let profile = PolicyProfile::new("g", PolicyMode::Default)
        .rule(PermissionRule::new(Specifier::tool("Edit"), Decision::Allow))
        .gate(GateRule::new("Edit", vec![GateCheck::PathUnder("/workspace".into())]));
    let call = ToolCall::new("c1", "Edit").path("/workspace/src/main.rs");
    let eval = evaluate(&profile, &call, &ctx());
    assert_eq!(eval.decision, Decision::Allow);
}

#[yare::parameterized(
    require_command = { GateCheck::RequireCommand },
    arg_present     = { GateCheck::ArgPresent("target".into()) },
    path_under      = { GateCheck::PathUnder("/workspace".into()) },
)]
fn gate_checks_fail_on_bare_call(check: GateCheck) {
    let profile = PolicyProfile::new("g", PolicyMode::Default)
        .gate(GateRule::new("Bash", vec![check]));
    let eval = evaluate(&profile, &ToolCall::new("c1", "Bash"), &ctx());
    assert_eq!(eval.decision, Decision::Ask);
}

#[test]
fn regex_rule_matches_command() {
    let profile = PolicyProfile::new("r", PolicyMode::Default)
        .rule(PermissionRule::new(
            Specifier::tool("Bash").regex(r"^cargo (build|test)\b"),
            Decision::Allow,
        ))
        .rule(PermissionRule::new(Specifier::tool("Bash"), Decision::Ask));
    let compiled = CompiledProfile::new(profile);

    let build = ToolCall::new("c1", "Bash").command("cargo build --release");
    assert_eq!(compiled.evaluate(&build, &ctx()).matched_rule, Some(0));

    let publish = ToolCall::new("c2", "Bash").command("cargo publish");
    assert_eq!(compiled.evaluate(&publish, &ctx()).matched_rule, Some(1));
}

#[test]
fn regex_only_consulted_after_literals_match() {
    // The regex would match, but the tool literal does not; rule must miss.
    let profile = PolicyProfile::new("r", PolicyMode::Default).rule(PermissionRule::new(
        Specifier::tool("Bash").regex(".*"),
        Decision::Allow,
    ));
    let eval = evaluate(&profile, &ToolCall::new("c1", "Read").path("x"), &ctx());
    assert_eq!(eval.decision, Decision::Deny);
    assert_eq!(eval.matched_rule, None);
}

#[test]
fn invalid_patterns_never_match() {
    let profile = PolicyProfile::new("bad", PolicyMode::Default)
        .rule(PermissionRule::new(
            Specifier::tool("Bash").regex("("),
            Decision::Allow,
        ))
        .rule(PermissionRule::new(Specifier::tool("Bash"), Decision::Ask));
    let compiled = CompiledProfile::new(profile);
    let eval = compiled.evaluate(&ToolCall::new("c1", "Bash").command("ls"), &ctx());
    assert_eq!(eval.matched_rule, Some(1));
}

#[test]
fn path_glob_requires_call_path() {
    let profile = PolicyProfile::new("p", PolicyMode::Default).rule(PermissionRule::new(
        Specifier::tool("Read").path("src/**"),
        Decision::Allow,
    ));
    let compiled = CompiledProfile::new(profile);

    let with_path = ToolCall::new("c1", "Read").path("src/lib.rs");
    assert_eq!(compiled.evaluate(&with_path, &ctx()).decision, Decision::Allow);

    let without_path = ToolCall::new("c2", "Read");
    assert_eq!(compiled.evaluate(&without_path, &ctx()).decision, Decision::Deny);
}

proptest! {
    /// The evaluator is a pure function: identical inputs give identical
    /// decisions, matched rule indexes, and reason text.
    #[test]
    fn evaluation_is_deterministic(
        tool in "[A-Za-z]{1,12}",
        command in proptest::option::of("[a-z ./-]{0,30}"),
        steps in 0u32..20,
    ) {
        let compiled = CompiledProfile::new(profile());
        let mut call = ToolCall::new("c1", tool);
        call.command = command;
        let ctx = EvalContext { step_count: steps, ..EvalContext::default() };

        let a = compiled.evaluate(&call, &ctx);
        let b = compiled.evaluate(&call, &ctx);
        prop_assert_eq!(a, b);
    }
}
