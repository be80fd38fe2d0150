// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the atc orchestration kernel.
//!
//! One [`Runtime`] per process coordinates run state machines, the plan
//! walker, approvals, and the event broker. Per-run work happens on
//! spawned tasks; shared state lives behind the registry and journal
//! locks.

mod plans;
mod reconcile;
mod runs;
mod sessions;

#[cfg(test)]
#[path = "../runtime_tests/mod.rs"]
mod tests;

pub use plans::{PlanSpec, StepSpec};
pub use reconcile::RecoveryReport;
pub use runs::StartRequest;

use crate::activity::ActivityLog;
use crate::approval::ApprovalRegistry;
use crate::broker::Broker;
use crate::error::EngineError;
use crate::registry::Registry;
use atc_adapters::{BusConfig, WorkerRegistry};
use atc_core::{
    Agent, AgentEvent, AgentId, AuditEntry, AuditOutcome, Clock, Config, Plan, PlanId,
    ProjectId, Run, RunId, Task, TaskId,
};
use atc_policy::ProfileStore;
use atc_storage::{AuditLog, EventJournal};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Shared dependencies handed to the runtime at startup.
pub struct RuntimeDeps {
    pub journal: Arc<EventJournal>,
    pub audit: Arc<AuditLog>,
    pub registry: Arc<Registry>,
    pub approvals: Arc<ApprovalRegistry>,
    pub broker: Arc<Broker>,
    pub policies: Arc<ProfileStore>,
    pub workers: Arc<WorkerRegistry>,
}

/// The orchestration kernel.
pub struct Runtime<C: Clock> {
    pub(crate) journal: Arc<EventJournal>,
    pub(crate) audit: Arc<AuditLog>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) approvals: Arc<ApprovalRegistry>,
    pub(crate) broker: Arc<Broker>,
    pub(crate) policies: Arc<ProfileStore>,
    pub(crate) workers: Arc<WorkerRegistry>,
    pub(crate) activity: ActivityLog,
    pub(crate) config: Config,
    pub(crate) clock: C,
    /// Root token; cancelling it stops every run loop and timer.
    pub(crate) shutdown: CancellationToken,
    /// Per-run cancellation tokens, children of `shutdown`.
    pub(crate) run_tokens: Mutex<HashMap<RunId, CancellationToken>>,
}

impl<C: Clock> Runtime<C> {
    pub fn new(deps: RuntimeDeps, config: Config, clock: C) -> Arc<Self> {
        Arc::new(Self {
            activity: ActivityLog::new(config.log_dir.join("runs")),
            journal: deps.journal,
            audit: deps.audit,
            registry: deps.registry,
            approvals: deps.approvals,
            broker: deps.broker,
            policies: deps.policies,
            workers: deps.workers,
            config,
            clock,
            shutdown: CancellationToken::new(),
            run_tokens: Mutex::new(HashMap::new()),
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn journal(&self) -> &Arc<EventJournal> {
        &self.journal
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    pub fn approvals(&self) -> &Arc<ApprovalRegistry> {
        &self.approvals
    }

    pub fn policies(&self) -> &Arc<ProfileStore> {
        &self.policies
    }

    pub fn audit_log(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Signal shutdown: every run loop, grace timer, and approval wait
    /// observes the root token.
    pub fn begin_shutdown(&self) {
        self.shutdown.cancel();
    }

    pub(crate) fn bus_config(&self) -> BusConfig {
        BusConfig {
            ack_timeout: Duration::from_millis(self.config.worker_dispatch_timeout_ms),
            retry_cap: self.config.dispatch_retry_cap,
            backoff_base: Duration::from_millis(250),
        }
    }

    pub(crate) fn require_task(&self, id: TaskId) -> Result<Task, EngineError> {
        self.registry.get_task(id).ok_or(EngineError::TaskNotFound(id))
    }

    pub(crate) fn require_agent(&self, id: AgentId) -> Result<Agent, EngineError> {
        self.registry.get_agent(id).ok_or(EngineError::AgentNotFound(id))
    }

    pub(crate) fn require_run(&self, id: RunId) -> Result<Run, EngineError> {
        self.registry.get_run(id).ok_or(EngineError::RunNotFound(id))
    }

    pub(crate) fn require_plan(&self, id: PlanId) -> Result<Plan, EngineError> {
        self.registry.get_plan(id).ok_or(EngineError::PlanNotFound(id))
    }

    /// Append one event durably, then fan it out live.
    pub(crate) fn append_and_publish(
        &self,
        project_id: ProjectId,
        event: AgentEvent,
    ) -> Result<AgentEvent, EngineError> {
        let appended = self.journal.append(event)?;
        self.activity.append(appended.run_id, appended.at_ms, &appended.payload.log_summary());
        self.broker.publish_event(project_id, &appended);
        Ok(appended)
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Record a control action in the audit journal. Audit failures are
    /// logged, never propagated: the action itself already happened.
    pub(crate) fn audit(&self, entry: AuditEntry) {
        if let Err(err) = self.audit.append(&entry) {
            tracing::error!(%err, action = %entry.action, "audit append failed");
        }
    }

    pub(crate) fn audit_action(
        &self,
        actor: &str,
        action: &str,
        run_id: Option<RunId>,
        project_id: Option<ProjectId>,
        outcome: AuditOutcome,
    ) {
        let mut entry = AuditEntry::new(actor, action, outcome, self.clock.epoch_ms());
        entry.run_id = run_id;
        entry.project_id = project_id;
        self.audit(entry);
    }

    /// Child cancellation token for a run, created on first use.
    pub(crate) fn run_token(&self, run_id: RunId) -> CancellationToken {
        self.run_tokens
            .lock()
            .entry(run_id)
            .or_insert_with(|| self.shutdown.child_token())
            .clone()
    }

    pub(crate) fn drop_run_token(&self, run_id: RunId) {
        self.run_tokens.lock().remove(&run_id);
    }

    /// Seed entities, used by the daemon surface and tests.
    pub fn create_project(&self, project: atc_core::Project) {
        self.registry.insert_project(project);
    }

    pub fn create_task(&self, task: Task) {
        self.registry.insert_task(task);
    }

    pub fn create_agent(&self, agent: Agent) {
        self.registry.insert_agent(agent);
    }

    /// Delete an agent. Rejected while the agent has live runs;
    /// idempotent once the agent is gone.
    pub fn delete_agent(&self, id: AgentId) -> Result<(), EngineError> {
        let live = self.registry.agent_live_runs(id);
        if !live.is_empty() {
            return Err(EngineError::AgentHasLiveRuns(id));
        }
        self.registry.write(|s| {
            if let Some(agent) = s.agents.get_mut(id.as_str()) {
                agent.status = atc_core::AgentStatus::Deleted;
            }
        });
        Ok(())
    }
}
