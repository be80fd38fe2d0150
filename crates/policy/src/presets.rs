// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in policy presets.
//!
//! Presets are process-wide, initialised once, read-only at runtime.
//! They may be read and cloned but never deleted or renamed.

use crate::profile::{
    Decision, GateCheck, GateRule, PermissionRule, PolicyMode, PolicyProfile, Specifier,
    Termination,
};
use std::sync::OnceLock;

const READ_TOOLS: &[&str] = &["Read", "Grep", "Glob", "LS"];
const EDIT_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit"];

fn allow(tool: &str) -> PermissionRule {
    PermissionRule::new(Specifier::tool(tool), Decision::Allow)
}

fn ask(tool: &str) -> PermissionRule {
    PermissionRule::new(Specifier::tool(tool), Decision::Ask)
}

fn deny(tool: &str) -> PermissionRule {
    PermissionRule::new(Specifier::tool(tool), Decision::Deny)
}

/// Read-only planning: reads allowed, everything else denied.
fn plan_readonly() -> PolicyProfile {
    let mut profile = PolicyProfile::new("plan-readonly", PolicyMode::Default);
    for tool in READ_TOOLS {
        profile = profile.rule(allow(tool));
    }
    profile
}

/// Safe headless default: reads and edits allowed, shell asks,
/// destructive tools deny and terminate.
fn headless_safe_sandbox() -> PolicyProfile {
    let mut profile = PolicyProfile::new("headless-safe-sandbox", PolicyMode::Default);
    for tool in READ_TOOLS {
        profile = profile.rule(allow(tool));
    }
    for tool in EDIT_TOOLS {
        profile = profile.rule(allow(tool));
    }
    profile
        .rule(ask("Bash"))
        .rule(deny("Delete").terminating())
        .gate(GateRule::new("Edit", vec![GateCheck::RequirePath]))
        .gate(GateRule::new("Bash", vec![GateCheck::RequireCommand]))
        .termination(Termination {
            max_steps: Some(500),
            max_cost_usd: Some(50.0),
            max_wall_ms: Some(4 * 60 * 60 * 1000),
            deny_terminates: false,
        })
}

/// Edits without asking; shell still asks for anything non-trivial.
fn auto_edit() -> PolicyProfile {
    let mut profile = PolicyProfile::new("auto-edit", PolicyMode::Default);
    for tool in READ_TOOLS {
        profile = profile.rule(allow(tool));
    }
    for tool in EDIT_TOOLS {
        profile = profile.rule(allow(tool));
    }
    profile
        .rule(PermissionRule::new(
            Specifier::tool("Bash").command("git status*"),
            Decision::Allow,
        ))
        .rule(PermissionRule::new(
            Specifier::tool("Bash").command("git diff*"),
            Decision::Allow,
        ))
        .rule(ask("Bash"))
        .rule(deny("Delete"))
}

/// Everything allowed; audit posture so nothing unmatched is denied.
fn full_access() -> PolicyProfile {
    PolicyProfile::new("full-access", PolicyMode::Audit)
        .rule(PermissionRule::new(Specifier::default(), Decision::Allow))
}

fn presets() -> &'static [PolicyProfile] {
    static PRESETS: OnceLock<Vec<PolicyProfile>> = OnceLock::new();
    PRESETS.get_or_init(|| {
        vec![plan_readonly(), headless_safe_sandbox(), auto_edit(), full_access()]
    })
}

/// Look up a built-in preset by name.
pub fn preset(name: &str) -> Option<&'static PolicyProfile> {
    presets().iter().find(|p| p.name == name)
}

/// Names of all built-in presets, in registration order.
pub fn preset_names() -> Vec<&'static str> {
    presets().iter().map(|p| p.name.as_str()).collect()
}

/// Whether a name refers to a built-in preset.
pub fn is_preset(name: &str) -> bool {
    preset(name).is_some()
}

#[cfg(test)]
#[path = "presets_tests.rs"]
mod tests;
