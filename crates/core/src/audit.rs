// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable audit records of control actions.

use crate::project::ProjectId;
use crate::run::RunId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an audit entry.
    pub struct AuditId("aud-");
}

/// Outcome of an audited control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Ok,
    Denied,
    Error,
}

crate::simple_display! {
    AuditOutcome {
        Ok => "ok",
        Denied => "denied",
        Error => "error",
    }
}

/// Immutable record of a control action (who, when, what, outcome).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditId,
    pub at_ms: u64,
    /// Acting principal (user id or "system").
    pub actor: String,
    /// Verb, e.g. "run.start", "run.approve", "plan.cancel".
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    pub outcome: AuditOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    pub fn new(actor: impl Into<String>, action: impl Into<String>, outcome: AuditOutcome, at_ms: u64) -> Self {
        Self {
            id: AuditId::new(),
            at_ms,
            actor: actor.into(),
            action: action.into(),
            run_id: None,
            project_id: None,
            outcome,
            detail: None,
        }
    }

    crate::setters! {
        option {
            run_id: RunId,
            project_id: ProjectId,
            detail: String,
        }
    }
}
