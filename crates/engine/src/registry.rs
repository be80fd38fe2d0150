// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory entity registry.
//!
//! Private to the process and reconstructible from the journal plus an
//! optional snapshot. Key maps are `String → entity` so git-style
//! unique-prefix lookups work for user-facing queries.

use atc_core::{
    find_by_prefix, Agent, AgentId, AgentStatus, Plan, PlanId, Project, ProjectId, Run, RunId,
    Session, Task, TaskId,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Serializable registry contents for snapshots.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub projects: HashMap<String, Project>,
    pub agents: HashMap<String, Agent>,
    pub tasks: HashMap<String, Task>,
    pub runs: HashMap<String, Run>,
    pub plans: HashMap<String, Plan>,
    #[serde(default)]
    pub sessions: HashMap<String, Session>,
    /// idempotency key → run id
    #[serde(default)]
    pub idempotency: HashMap<String, RunId>,
}

/// Process-private registry of live entity state.
#[derive(Default)]
pub struct Registry {
    state: Mutex<RegistrySnapshot>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        Self { state: Mutex::new(snapshot) }
    }

    /// Read access under the lock.
    pub fn read<T>(&self, f: impl FnOnce(&RegistrySnapshot) -> T) -> T {
        let guard = self.state.lock();
        f(&guard)
    }

    /// Write access under the lock.
    pub fn write<T>(&self, f: impl FnOnce(&mut RegistrySnapshot) -> T) -> T {
        let mut guard = self.state.lock();
        f(&mut guard)
    }

    /// Clone of the full state for snapshotting.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.state.lock().clone()
    }

    // -- projects --

    pub fn insert_project(&self, project: Project) {
        self.write(|s| s.projects.insert(project.id.to_string(), project));
    }

    pub fn get_project(&self, id: ProjectId) -> Option<Project> {
        self.read(|s| s.projects.get(id.as_str()).cloned())
    }

    // -- agents --

    pub fn insert_agent(&self, agent: Agent) {
        self.write(|s| s.agents.insert(agent.id.to_string(), agent));
    }

    pub fn get_agent(&self, id: AgentId) -> Option<Agent> {
        self.read(|s| s.agents.get(id.as_str()).cloned())
    }

    pub fn set_agent_status(&self, id: AgentId, status: AgentStatus) {
        self.write(|s| {
            if let Some(agent) = s.agents.get_mut(id.as_str()) {
                agent.status = status;
            }
        });
    }

    /// Live (non-terminal) runs bound to this agent.
    pub fn agent_live_runs(&self, id: AgentId) -> Vec<RunId> {
        self.read(|s| {
            s.runs
                .values()
                .filter(|r| r.agent_id == id && !r.is_terminal())
                .map(|r| r.id)
                .collect()
        })
    }

    // -- tasks --

    pub fn insert_task(&self, task: Task) {
        self.write(|s| s.tasks.insert(task.id.to_string(), task));
    }

    pub fn get_task(&self, id: TaskId) -> Option<Task> {
        self.read(|s| s.tasks.get(id.as_str()).cloned())
    }

    pub fn set_task_status(&self, id: TaskId, status: atc_core::TaskStatus) {
        self.write(|s| {
            if let Some(task) = s.tasks.get_mut(id.as_str()) {
                task.status = status;
            }
        });
    }

    // -- runs --

    pub fn insert_run(&self, run: Run) {
        self.write(|s| {
            if let Some(key) = &run.idempotency_key {
                s.idempotency.insert(key.clone(), run.id);
            }
            s.runs.insert(run.id.to_string(), run);
        });
    }

    pub fn get_run(&self, id: RunId) -> Option<Run> {
        self.read(|s| s.runs.get(id.as_str()).cloned())
    }

    /// Resolve a run by full id or unique prefix.
    pub fn find_run(&self, id: &str) -> Option<Run> {
        self.read(|s| find_by_prefix(&s.runs, id).cloned())
    }

    pub fn run_for_idempotency_key(&self, key: &str) -> Option<Run> {
        self.read(|s| {
            let run_id = s.idempotency.get(key)?;
            s.runs.get(run_id.as_str()).cloned()
        })
    }

    /// Mutate a run in place; returns `None` when the run is unknown.
    pub fn update_run<T>(&self, id: RunId, f: impl FnOnce(&mut Run) -> T) -> Option<T> {
        self.write(|s| s.runs.get_mut(id.as_str()).map(f))
    }

    pub fn runs_for_project(&self, project_id: ProjectId) -> Vec<Run> {
        self.read(|s| {
            s.runs.values().filter(|r| r.project_id == project_id).cloned().collect()
        })
    }

    pub fn non_terminal_runs(&self) -> Vec<Run> {
        self.read(|s| s.runs.values().filter(|r| !r.is_terminal()).cloned().collect())
    }

    // -- plans --

    pub fn insert_plan(&self, plan: Plan) {
        self.write(|s| s.plans.insert(plan.id.to_string(), plan));
    }

    pub fn get_plan(&self, id: PlanId) -> Option<Plan> {
        self.read(|s| s.plans.get(id.as_str()).cloned())
    }

    pub fn update_plan<T>(&self, id: PlanId, f: impl FnOnce(&mut Plan) -> T) -> Option<T> {
        self.write(|s| s.plans.get_mut(id.as_str()).map(f))
    }

    // -- sessions --

    pub fn insert_session(&self, session: Session) {
        self.write(|s| s.sessions.insert(session.id.to_string(), session));
    }

    pub fn get_session(&self, id: atc_core::SessionId) -> Option<Session> {
        self.read(|s| s.sessions.get(id.as_str()).cloned())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
