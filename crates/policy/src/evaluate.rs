// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pure policy evaluator.
//!
//! Evaluation order: termination limits, quality gates, ordered rules,
//! profile default. Regex rules are compiled once per profile and only
//! consulted after a rule's literal patterns matched.

use crate::profile::{Decision, GateCheck, PolicyMode, PolicyProfile, Specifier};
use atc_core::ToolCall;

/// Run-state inputs to termination checks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalContext {
    pub step_count: u32,
    pub cost_usd: f64,
    pub elapsed_ms: u64,
}

/// Outcome of one evaluation. Deterministic for identical inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: Decision,
    /// Index into the profile's rules, when a rule matched.
    pub matched_rule: Option<usize>,
    pub reason: String,
    /// Whether a firing deny should terminate the run.
    pub deny_terminates: bool,
}

impl Evaluation {
    fn new(decision: Decision, matched_rule: Option<usize>, reason: String) -> Self {
        Self { decision, matched_rule, reason, deny_terminates: false }
    }
}

/// A profile with its glob and regex patterns compiled once.
///
/// Compiling is infallible: malformed patterns simply never match and
/// are reported once through tracing at compile time.
pub struct CompiledProfile {
    profile: PolicyProfile,
    compiled: Vec<CompiledSpecifier>,
}

struct CompiledSpecifier {
    path: Option<glob::Pattern>,
    command: Option<glob::Pattern>,
    regex: Option<regex::Regex>,
}

impl CompiledSpecifier {
    fn compile(spec: &Specifier, profile: &str, index: usize) -> Self {
        let path = spec.path.as_deref().and_then(|p| match glob::Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                tracing::warn!(profile, rule = index, pattern = p, %err, "invalid path glob");
                None
            }
        });
        let command = spec.command.as_deref().and_then(|c| match glob::Pattern::new(c) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                tracing::warn!(profile, rule = index, pattern = c, %err, "invalid command glob");
                None
            }
        });
        let regex = spec.regex.as_deref().and_then(|r| match regex::Regex::new(r) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!(profile, rule = index, pattern = r, %err, "invalid regex");
                None
            }
        });
        Self { path, command, regex }
    }
}

impl CompiledProfile {
    pub fn new(profile: PolicyProfile) -> Self {
        let compiled = profile
            .rules
            .iter()
            .enumerate()
            .map(|(i, r)| CompiledSpecifier::compile(&r.specifier, &profile.name, i))
            .collect();
        Self { profile, compiled }
    }

    pub fn profile(&self) -> &PolicyProfile {
        &self.profile
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Whether the rule at `index` matches the call.
    ///
    /// Literal parts first; the regex only runs when they matched.
    fn rule_matches(&self, index: usize, call: &ToolCall) -> bool {
        let spec = &self.profile.rules[index].specifier;
        let compiled = &self.compiled[index];

        if let Some(tool) = &spec.tool {
            if tool != &call.tool {
                return false;
            }
        }
        if spec.path.is_some() {
            let Some(pattern) = &compiled.path else { return false };
            match &call.path {
                Some(path) if pattern.matches(path) => {}
                _ => return false,
            }
        }
        if spec.command.is_some() {
            let Some(pattern) = &compiled.command else { return false };
            match &call.command {
                Some(command) if pattern.matches(command) => {}
                _ => return false,
            }
        }
        if spec.regex.is_some() {
            let Some(re) = &compiled.regex else { return false };
            let subject = call.command.as_deref().or(call.path.as_deref()).unwrap_or(&call.tool);
            if !re.is_match(subject) {
                return false;
            }
        }
        true
    }

    /// Evaluate a tool call. See module docs for the procedure.
    pub fn evaluate(&self, call: &ToolCall, ctx: &EvalContext) -> Evaluation {
        let profile = &self.profile;

        // 1. Termination limits take precedence over all rules.
        let term = &profile.termination;
        if let Some(max) = term.max_steps {
            if ctx.step_count >= max {
                let mut eval = Evaluation::new(
                    Decision::Deny,
                    None,
                    format!("terminated: max_steps ({})", max),
                );
                eval.deny_terminates = true;
                return eval;
            }
        }
        if let Some(max) = term.max_cost_usd {
            if ctx.cost_usd >= max {
                let mut eval = Evaluation::new(
                    Decision::Deny,
                    None,
                    format!("terminated: max_cost_usd ({})", max),
                );
                eval.deny_terminates = true;
                return eval;
            }
        }
        if let Some(max) = term.max_wall_ms {
            if ctx.elapsed_ms >= max {
                let mut eval = Evaluation::new(
                    Decision::Deny,
                    None,
                    format!("terminated: max_wall_ms ({})", max),
                );
                eval.deny_terminates = true;
                return eval;
            }
        }

        // 2. Quality gates: failed preconditions ask, or deny under strict.
        for gate in &profile.gates {
            if gate.tool != call.tool {
                continue;
            }
            for check in &gate.checks {
                if let Some(failure) = gate_failure(check, call) {
                    let decision = if profile.mode == PolicyMode::Strict {
                        Decision::Deny
                    } else {
                        Decision::Ask
                    };
                    return Evaluation::new(
                        decision,
                        None,
                        format!("quality gate: {} {}", gate.tool, failure),
                    );
                }
            }
        }

        // 3. First matching rule wins.
        for (index, rule) in profile.rules.iter().enumerate() {
            if self.rule_matches(index, call) {
                let mut eval = Evaluation::new(
                    rule.decision,
                    Some(index),
                    format!("rule {} matched {}", index, call.tool),
                );
                eval.deny_terminates = rule.on_deny_terminate || term.deny_terminates;
                return eval;
            }
        }

        // 4. Profile default.
        let decision = profile.default_decision();
        let mut eval = Evaluation::new(
            decision,
            None,
            format!("no rule matched {}; {} default", call.tool, profile.mode),
        );
        eval.deny_terminates = term.deny_terminates;
        eval
    }
}

fn gate_failure(check: &GateCheck, call: &ToolCall) -> Option<String> {
    match check {
        GateCheck::RequirePath => {
            call.path.is_none().then(|| "requires a path".to_string())
        }
        GateCheck::RequireCommand => {
            call.command.is_none().then(|| "requires a command".to_string())
        }
        GateCheck::ArgPresent(arg) => (!call.args.contains_key(arg))
            .then(|| format!("requires argument '{}'", arg)),
        GateCheck::PathUnder(prefix) => match &call.path {
            Some(path) if path.starts_with(prefix.as_str()) => None,
            _ => Some(format!("path must be under {}", prefix)),
        },
    }
}

/// Evaluate a tool call against an uncompiled profile.
///
/// Convenience for one-shot callers; long-lived callers should hold a
/// [`CompiledProfile`] so patterns compile once.
pub fn evaluate(profile: &PolicyProfile, call: &ToolCall, ctx: &EvalContext) -> Evaluation {
    CompiledProfile::new(profile.clone()).evaluate(call, ctx)
}

#[cfg(test)]
#[path = "evaluate_tests.rs"]
mod tests;
