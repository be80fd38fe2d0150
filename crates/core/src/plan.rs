// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plans: directed acyclic graphs of steps with a collaboration protocol.

use crate::agent::AgentId;
use crate::project::ProjectId;
use crate::run::RunId;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

crate::define_id! {
    /// Unique identifier for a plan.
    pub struct PlanId("pln-");
}

crate::define_id! {
    /// Unique identifier for a plan step.
    pub struct StepId("stp-");
}

/// Scheduling discipline for step execution within a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Sequential,
    Parallel,
    PingPong,
    Hierarchical,
}

crate::simple_display! {
    Protocol {
        Sequential => "sequential",
        Parallel => "parallel",
        PingPong => "ping_pong",
        Hierarchical => "hierarchical",
    }
}

/// Status of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Running,
    Paused,
    Succeeded,
    Failed,
    Cancelled,
}

crate::simple_display! {
    PlanStatus {
        Draft => "draft",
        Running => "running",
        Paused => "paused",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl PlanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Succeeded | PlanStatus::Failed | PlanStatus::Cancelled)
    }
}

/// Status of a plan step. Terminal statuses are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    Skipped,
    Cancelled,
}

crate::simple_display! {
    StepStatus {
        Pending => "pending",
        Ready => "ready",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Skipped => "skipped",
        Cancelled => "cancelled",
    }
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::Failed | StepStatus::Skipped | StepStatus::Cancelled
        )
    }
}

/// How a step's output is delivered to its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverMode {
    /// Output appended to the dependent's prompt context.
    #[default]
    Context,
    /// Output delivered as the dependent's full prompt.
    Prompt,
    /// Output discarded; only the terminal status matters.
    StatusOnly,
}

/// What a failed step does to the rest of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// A failed step fails the plan immediately.
    Strict,
    /// A failure is isolated to the step's transitive dependents.
    #[default]
    Lenient,
}

/// One node of the plan DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub plan_id: PlanId,
    pub task_id: TaskId,
    pub agent_id: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_id: Option<String>,
    #[serde(default)]
    pub deliver_mode: DeliverMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<StepId>,
    pub status: StepStatus,
    /// Assigned when the step starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    /// Alternation counter for ping-pong plans.
    #[serde(default)]
    pub round: u32,
    /// Declared position, used as the sequential tie-break.
    #[serde(default)]
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Step {
    pub fn new(plan_id: PlanId, task_id: TaskId, agent_id: AgentId, index: usize) -> Self {
        Self {
            id: StepId::new(),
            plan_id,
            task_id,
            agent_id,
            policy_profile: None,
            mode_id: None,
            deliver_mode: DeliverMode::default(),
            depends_on: Vec::new(),
            status: StepStatus::Pending,
            run_id: None,
            round: 0,
            index,
            error: None,
        }
    }

    crate::setters! {
        set {
            deliver_mode: DeliverMode,
            depends_on: Vec<StepId>,
        }
        option {
            policy_profile: String,
            mode_id: String,
        }
    }

    /// Apply a status transition, rejecting moves out of a terminal status.
    pub fn set_status(&mut self, next: StepStatus) -> Result<(), PlanError> {
        if self.status == next {
            return Ok(());
        }
        if self.status.is_terminal() {
            return Err(PlanError::StepTerminal { step: self.id, status: self.status });
        }
        self.status = next;
        Ok(())
    }
}

/// A directed acyclic graph of steps with a protocol label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub project_id: ProjectId,
    pub name: String,
    pub protocol: Protocol,
    pub status: PlanStatus,
    /// Upper bound on concurrently running steps. Always ≥ 1.
    pub max_parallel: usize,
    /// Round ceiling for ping-pong plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    pub steps: Vec<Step>,
    /// Failure reason when the plan ends failed (e.g. "max_rounds_reached").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at_ms: u64,
}

/// Plan construction and transition failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("plan has a dependency cycle involving step {0}")]
    Cycle(StepId),
    #[error("step {step} depends on unknown step {missing}")]
    UnknownDependency { step: StepId, missing: StepId },
    #[error("step {step} is terminal ({status}) and cannot transition")]
    StepTerminal { step: StepId, status: StepStatus },
    #[error("ping_pong plans require exactly two steps, got {0}")]
    PingPongArity(usize),
    #[error("max_parallel must be >= 1")]
    ZeroParallel,
    #[error("plan has no steps")]
    Empty,
}

impl Plan {
    pub fn new(
        project_id: ProjectId,
        name: impl Into<String>,
        protocol: Protocol,
        max_parallel: usize,
        epoch_ms: u64,
    ) -> Self {
        Self {
            id: PlanId::new(),
            project_id,
            name: name.into(),
            protocol,
            status: PlanStatus::Draft,
            max_parallel: max_parallel.max(1),
            max_rounds: None,
            failure_policy: FailurePolicy::default(),
            steps: Vec::new(),
            error: None,
            created_at_ms: epoch_ms,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Append a step, assigning its declared index.
    pub fn push_step(&mut self, mut step: Step) -> StepId {
        step.index = self.steps.len();
        step.plan_id = self.id;
        let id = step.id;
        self.steps.push(step);
        id
    }

    /// Validate the DAG: known dependencies, no cycles, protocol arity.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.steps.is_empty() {
            return Err(PlanError::Empty);
        }
        if self.max_parallel == 0 {
            return Err(PlanError::ZeroParallel);
        }
        if self.protocol == Protocol::PingPong && self.steps.len() != 2 {
            return Err(PlanError::PingPongArity(self.steps.len()));
        }

        let known: HashSet<StepId> = self.steps.iter().map(|s| s.id).collect();
        for step in &self.steps {
            for dep in &step.depends_on {
                if !known.contains(dep) {
                    return Err(PlanError::UnknownDependency { step: step.id, missing: *dep });
                }
            }
        }

        // Kahn's algorithm: any step never reaching in-degree 0 is on a cycle.
        let mut in_degree: HashMap<StepId, usize> =
            self.steps.iter().map(|s| (s.id, s.depends_on.len())).collect();
        let mut queue: Vec<StepId> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0usize;
        while let Some(id) = queue.pop() {
            visited += 1;
            for step in &self.steps {
                if step.depends_on.contains(&id) {
                    let d = in_degree.entry(step.id).or_insert(0);
                    *d = d.saturating_sub(1);
                    if *d == 0 {
                        queue.push(step.id);
                    }
                }
            }
        }
        if visited != self.steps.len() {
            let on_cycle = self
                .steps
                .iter()
                .find(|s| in_degree.get(&s.id).copied().unwrap_or(0) > 0)
                .map(|s| s.id)
                .unwrap_or_else(StepId::new);
            return Err(PlanError::Cycle(on_cycle));
        }
        Ok(())
    }

    /// Step ids that transitively depend on `root`.
    pub fn transitive_dependents(&self, root: StepId) -> HashSet<StepId> {
        let mut out = HashSet::new();
        let mut frontier = vec![root];
        while let Some(id) = frontier.pop() {
            for step in &self.steps {
                if step.depends_on.contains(&id) && out.insert(step.id) {
                    frontier.push(step.id);
                }
            }
        }
        out
    }

    /// Steps whose predecessors have all succeeded and are not yet started.
    pub fn ready_steps(&self) -> Vec<&Step> {
        let by_id: HashMap<StepId, &Step> = self.steps.iter().map(|s| (s.id, s)).collect();
        let mut ready: Vec<&Step> = self
            .steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Pending | StepStatus::Ready))
            .filter(|s| {
                s.depends_on.iter().all(|dep| {
                    by_id.get(dep).map(|d| d.status == StepStatus::Succeeded).unwrap_or(false)
                })
            })
            .collect();
        ready.sort_by_key(|s| s.index);
        ready
    }

    /// Count of currently running steps.
    pub fn running_count(&self) -> usize {
        self.steps.iter().filter(|s| s.status == StepStatus::Running).count()
    }

    /// Whether every step is terminal.
    pub fn all_steps_terminal(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }
}

crate::builder! {
    pub struct PlanBuilder => Plan {
        into {
            name: String = "test-plan",
        }
        set {
            id: PlanId = PlanId::new(),
            project_id: ProjectId = ProjectId::new(),
            protocol: Protocol = Protocol::Sequential,
            status: PlanStatus = PlanStatus::Draft,
            max_parallel: usize = 1,
            failure_policy: FailurePolicy = FailurePolicy::default(),
            steps: Vec<Step> = Vec::new(),
            created_at_ms: u64 = 1_000_000,
        }
        option {
            max_rounds: u32 = None,
            error: String = None,
        }
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
