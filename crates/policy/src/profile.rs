// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy profile types: rules, gates, and termination limits.

use serde::{Deserialize, Serialize};

/// Outcome of evaluating a tool call against a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
    Ask,
}

atc_core::simple_display! {
    Decision {
        Allow => "allow",
        Deny => "deny",
        Ask => "ask",
    }
}

/// Default posture of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Unmatched calls are denied.
    #[default]
    Default,
    /// Unmatched calls are denied and gate failures deny instead of ask.
    Strict,
    /// Unmatched calls ask; nothing is silently denied.
    Audit,
}

atc_core::simple_display! {
    PolicyMode {
        Default => "default",
        Strict => "strict",
        Audit => "audit",
    }
}

/// Pattern over a tool call. All set fields must match.
///
/// `tool` matches exactly; `path` and `command` are globs; `regex` is
/// tested against the command (falling back to the path) and is only
/// evaluated after the literal patterns matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

impl Specifier {
    pub fn tool(tool: impl Into<String>) -> Self {
        Self { tool: Some(tool.into()), ..Self::default() }
    }

    atc_core::setters! {
        option {
            path: String,
            command: String,
            regex: String,
        }
    }

    /// A specifier with no fields set matches every call.
    pub fn is_catch_all(&self) -> bool {
        self.tool.is_none() && self.path.is_none() && self.command.is_none() && self.regex.is_none()
    }
}

/// One ordered rule: first matching specifier wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    #[serde(flatten)]
    pub specifier: Specifier,
    pub decision: Decision,
    /// When a deny rule fires, terminate the run instead of continuing.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub on_deny_terminate: bool,
}

impl PermissionRule {
    pub fn new(specifier: Specifier, decision: Decision) -> Self {
        Self { specifier, decision, on_deny_terminate: false }
    }

    pub fn terminating(mut self) -> Self {
        self.on_deny_terminate = true;
        self
    }
}

/// A precondition a tool call must satisfy before its rule is consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCheck {
    /// Call must carry a path.
    RequirePath,
    /// Call must carry a command.
    RequireCommand,
    /// Named argument must be present.
    ArgPresent(String),
    /// Path must stay under the given prefix.
    PathUnder(String),
}

atc_core::simple_display! {
    GateCheck {
        RequirePath => "require_path",
        RequireCommand => "require_command",
        ArgPresent(..) => "arg_present",
        PathUnder(..) => "path_under",
    }
}

/// Per-tool quality gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRule {
    pub tool: String,
    pub checks: Vec<GateCheck>,
}

impl GateRule {
    pub fn new(tool: impl Into<String>, checks: Vec<GateCheck>) -> Self {
        Self { tool: tool.into(), checks }
    }
}

/// Hard stop limits. Exceeding any limit denies before rules are consulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Termination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wall_ms: Option<u64>,
    /// Whether a deny rule terminates the run.
    #[serde(default)]
    pub deny_terminates: bool,
}

/// A named set of ordered permission rules, quality gates, and limits.
///
/// Built-in presets cannot be deleted or renamed; they may be cloned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyProfile {
    pub name: String,
    #[serde(default)]
    pub mode: PolicyMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<PermissionRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gates: Vec<GateRule>,
    #[serde(default)]
    pub termination: Termination,
}

impl PolicyProfile {
    pub fn new(name: impl Into<String>, mode: PolicyMode) -> Self {
        Self {
            name: name.into(),
            mode,
            rules: Vec::new(),
            gates: Vec::new(),
            termination: Termination::default(),
        }
    }

    pub fn rule(mut self, rule: PermissionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn gate(mut self, gate: GateRule) -> Self {
        self.gates.push(gate);
        self
    }

    pub fn termination(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    /// Decision applied when no rule matches.
    pub fn default_decision(&self) -> Decision {
        match self.mode {
            PolicyMode::Audit => Decision::Ask,
            PolicyMode::Default | PolicyMode::Strict => Decision::Deny,
        }
    }

    /// Clone under a new name (presets are cloned this way).
    pub fn clone_as(&self, name: impl Into<String>) -> Self {
        let mut clone = self.clone();
        clone.name = name.into();
        clone
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
