// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agents: configured worker-backend instances bound to a project.

use crate::project::ProjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for an agent.
    pub struct AgentId("agt-");
}

/// Lifecycle status of an agent.
///
/// Only an `Idle` agent may be dispatched. Deletion of an agent with
/// live runs is rejected, so `Deleted` implies no live runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Error,
    Deleted,
}

crate::simple_display! {
    AgentStatus {
        Idle => "idle",
        Busy => "busy",
        Error => "error",
        Deleted => "deleted",
    }
}

impl AgentStatus {
    pub fn is_dispatchable(&self) -> bool {
        matches!(self, AgentStatus::Idle)
    }
}

/// Resource ceilings enforced by the worker backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_millis: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_mb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_ms: Option<u64>,
    /// Network access allowed.
    #[serde(default)]
    pub net: bool,
}

/// A configured worker-backend instance bound to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub project_id: ProjectId,
    pub name: String,
    /// Worker backend registry key (e.g. "claude-code", "headless-sandbox").
    pub backend_kind: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub config: HashMap<String, String>,
    #[serde(default)]
    pub limits: ResourceLimits,
    pub status: AgentStatus,
}

impl Agent {
    pub fn new(project_id: ProjectId, name: impl Into<String>, backend_kind: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(),
            project_id,
            name: name.into(),
            backend_kind: backend_kind.into(),
            config: HashMap::new(),
            limits: ResourceLimits::default(),
            status: AgentStatus::Idle,
        }
    }
}

crate::builder! {
    pub struct AgentBuilder => Agent {
        into {
            name: String = "test-agent",
            backend_kind: String = "fake",
        }
        set {
            id: AgentId = AgentId::new(),
            project_id: ProjectId = ProjectId::new(),
            config: HashMap<String, String> = HashMap::new(),
            limits: ResourceLimits = ResourceLimits::default(),
            status: AgentStatus = AgentStatus::Idle,
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
