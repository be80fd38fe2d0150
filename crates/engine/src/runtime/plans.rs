// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan engine: drives a step DAG to a terminal state.
//!
//! Scheduling is event-triggered: every run terminal observed through
//! the broker re-enters [`Runtime::tick`], which schedules whatever the
//! protocol allows. Step status transitions are serialised by the
//! registry lock, giving a total order per plan.

use super::runs::StartRequest;
use super::Runtime;
use crate::broker::{StreamItem, Topic};
use crate::error::EngineError;
use atc_core::{
    AgentId, AuditOutcome, Clock, DeliverMode, EventPayload, FailurePolicy, Plan, PlanId,
    PlanStatus, Protocol, RunId, RunStatus, Step, StepId, StepStatus, SubstepSpec, TaskId,
};
use std::sync::Arc;

/// One step of a plan request.
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub policy_profile: Option<String>,
    /// Indexes into the spec list; resolved to step ids at creation.
    pub depends_on: Vec<usize>,
    pub deliver_mode: DeliverMode,
}

impl StepSpec {
    pub fn new(task_id: TaskId, agent_id: AgentId) -> Self {
        Self {
            task_id,
            agent_id,
            policy_profile: None,
            depends_on: Vec::new(),
            deliver_mode: DeliverMode::default(),
        }
    }

    atc_core::setters! {
        set {
            depends_on: Vec<usize>,
            deliver_mode: DeliverMode,
        }
        option {
            policy_profile: String,
        }
    }
}

/// A plan creation request.
#[derive(Debug, Clone)]
pub struct PlanSpec {
    pub project_id: atc_core::ProjectId,
    pub name: String,
    pub protocol: Protocol,
    pub max_parallel: usize,
    pub max_rounds: Option<u32>,
    pub failure_policy: FailurePolicy,
    pub steps: Vec<StepSpec>,
    pub actor: String,
}

impl PlanSpec {
    pub fn new(project_id: atc_core::ProjectId, name: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            project_id,
            name: name.into(),
            protocol,
            max_parallel: 1,
            max_rounds: None,
            failure_policy: FailurePolicy::default(),
            steps: Vec::new(),
            actor: "system".to_string(),
        }
    }

    pub fn step(mut self, step: StepSpec) -> Self {
        self.steps.push(step);
        self
    }

    atc_core::setters! {
        set {
            max_parallel: usize,
            failure_policy: FailurePolicy,
        }
        option {
            max_rounds: u32,
        }
    }
}

impl<C: Clock> Runtime<C> {
    /// Validate and store a plan in `draft` status.
    pub fn create_plan(&self, spec: PlanSpec) -> Result<Plan, EngineError> {
        self.registry
            .get_project(spec.project_id)
            .ok_or(EngineError::ProjectNotFound(spec.project_id))?;

        let mut plan = Plan::new(
            spec.project_id,
            spec.name,
            spec.protocol,
            spec.max_parallel,
            self.clock.epoch_ms(),
        );
        plan.failure_policy = spec.failure_policy;
        plan.max_rounds = spec.max_rounds.or_else(|| {
            (spec.protocol == Protocol::PingPong).then_some(self.config.ping_pong_max_rounds)
        });

        // Every step must reference an existing task and agent of the
        // plan's project.
        for step_spec in &spec.steps {
            let task = self.require_task(step_spec.task_id)?;
            let agent = self.require_agent(step_spec.agent_id)?;
            if task.project_id != spec.project_id || agent.project_id != spec.project_id {
                return Err(EngineError::Validation(format!(
                    "step task {} / agent {} outside plan project",
                    task.id, agent.id
                )));
            }
            let mut step = Step::new(plan.id, task.id, agent.id, 0);
            step.policy_profile = step_spec.policy_profile.clone();
            step.deliver_mode = step_spec.deliver_mode;
            plan.push_step(step);
        }
        // Resolve declared-index dependencies to step ids.
        for (i, step_spec) in spec.steps.iter().enumerate() {
            let deps: Result<Vec<StepId>, EngineError> = step_spec
                .depends_on
                .iter()
                .map(|&idx| {
                    plan.steps
                        .get(idx)
                        .map(|s| s.id)
                        .ok_or_else(|| {
                            EngineError::Validation(format!("step {} depends on unknown index {}", i, idx))
                        })
                })
                .collect();
            plan.steps[i].depends_on = deps?;
        }
        plan.validate()?;

        self.audit_action(&spec.actor, "plan.create", None, Some(plan.project_id), AuditOutcome::Ok);
        self.registry.insert_plan(plan.clone());
        Ok(plan)
    }

    /// Move a draft plan to `running` and schedule its first steps.
    pub async fn start_plan(self: &Arc<Self>, plan_id: PlanId, actor: &str) -> Result<Plan, EngineError> {
        let plan = self.require_plan(plan_id)?;
        if plan.status != PlanStatus::Draft && plan.status != PlanStatus::Paused {
            return Err(EngineError::Conflict(format!(
                "plan {} is {}, not startable",
                plan_id, plan.status
            )));
        }
        self.registry.update_plan(plan_id, |p| p.status = PlanStatus::Running);
        self.audit_action(actor, "plan.start", None, Some(plan.project_id), AuditOutcome::Ok);
        self.tick(plan_id).await?;
        self.require_plan(plan_id)
    }

    /// Pause scheduling; running steps keep running.
    pub fn pause_plan(&self, plan_id: PlanId, actor: &str) -> Result<Plan, EngineError> {
        let plan = self.require_plan(plan_id)?;
        if plan.status != PlanStatus::Running {
            return Err(EngineError::Conflict(format!("plan {} is {}", plan_id, plan.status)));
        }
        self.registry.update_plan(plan_id, |p| p.status = PlanStatus::Paused);
        self.audit_action(actor, "plan.pause", None, Some(plan.project_id), AuditOutcome::Ok);
        self.require_plan(plan_id)
    }

    /// Cancel the plan: cancel running steps' runs, mark the rest.
    pub async fn cancel_plan(self: &Arc<Self>, plan_id: PlanId, actor: &str) -> Result<Plan, EngineError> {
        let plan = self.require_plan(plan_id)?;
        if plan.is_terminal() {
            return Ok(plan);
        }
        let running_runs: Vec<RunId> = self.registry.update_plan(plan_id, |p| {
            p.status = PlanStatus::Cancelled;
            let mut runs = Vec::new();
            for step in &mut p.steps {
                match step.status {
                    StepStatus::Running => {
                        if let Some(run_id) = step.run_id {
                            runs.push(run_id);
                        }
                    }
                    StepStatus::Pending | StepStatus::Ready => {
                        let _ = step.set_status(StepStatus::Cancelled);
                    }
                    _ => {}
                }
            }
            runs
        })
        .unwrap_or_default();

        for run_id in running_runs {
            if let Err(err) = self.cancel_run(run_id, actor).await {
                tracing::warn!(plan = %plan_id, run = %run_id, %err, "step cancel failed");
            }
        }
        self.audit_action(actor, "plan.cancel", None, Some(plan.project_id), AuditOutcome::Ok);
        self.require_plan(plan_id)
    }

    /// Schedule as much as the protocol allows, then re-check completion.
    pub(crate) async fn tick(self: &Arc<Self>, plan_id: PlanId) -> Result<(), EngineError> {
        loop {
            let Some(step_id) = self.next_schedulable(plan_id) else { break };
            if let Err(err) = self.launch_step(plan_id, step_id).await {
                tracing::warn!(plan = %plan_id, step = %step_id, %err, "step launch failed");
                self.apply_step_terminal(plan_id, step_id, RunStatus::Failed, false, Vec::new());
            }
        }
        self.check_plan_completion(plan_id);
        Ok(())
    }

    /// Type-erased tick for use inside step monitors.
    fn tick_detached(
        self: &Arc<Self>,
        plan_id: PlanId,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        let runtime = Arc::clone(self);
        Box::pin(async move {
            if let Err(err) = runtime.tick(plan_id).await {
                tracing::error!(plan = %plan_id, %err, "plan tick failed");
            }
        })
    }

    /// Pick one step to run under the protocol, marking it `running`.
    ///
    /// Returning one step at a time (the tick loops) keeps the per-plan
    /// transition order total even for parallel plans.
    fn next_schedulable(&self, plan_id: PlanId) -> Option<StepId> {
        self.registry
            .update_plan(plan_id, |plan| {
                if plan.status != PlanStatus::Running {
                    return None;
                }
                match plan.protocol {
                    Protocol::Sequential => {
                        if plan.running_count() > 0 {
                            return None;
                        }
                        let id = plan.ready_steps().first().map(|s| s.id)?;
                        mark_running(plan, id);
                        Some(id)
                    }
                    Protocol::Parallel | Protocol::Hierarchical => {
                        if plan.running_count() >= plan.max_parallel {
                            return None;
                        }
                        let id = plan.ready_steps().first().map(|s| s.id)?;
                        mark_running(plan, id);
                        Some(id)
                    }
                    Protocol::PingPong => {
                        if plan.running_count() > 0 {
                            return None;
                        }
                        let runs_done: u32 = plan.steps.iter().map(|s| s.round).sum();
                        let next_index = (runs_done % 2) as usize;
                        let step = plan.steps.get_mut(next_index)?;
                        if step.status.is_terminal() {
                            return None;
                        }
                        step.round += 1;
                        let _ = step.set_status(StepStatus::Running);
                        Some(step.id)
                    }
                }
            })
            .flatten()
    }

    /// Start the step's run with a monitor attached before dispatch, so
    /// the terminal notice cannot be missed.
    async fn launch_step(self: &Arc<Self>, plan_id: PlanId, step_id: StepId) -> Result<(), EngineError> {
        let plan = self.require_plan(plan_id)?;
        let step = plan
            .step(step_id)
            .ok_or_else(|| EngineError::Validation(format!("step {} not in plan", step_id)))?
            .clone();

        let run_id = RunId::new();
        self.registry.update_plan(plan_id, |p| {
            if let Some(s) = p.step_mut(step_id) {
                s.run_id = Some(run_id);
            }
        });

        let mut subscription = self.broker.subscribe(Topic::Run(run_id));
        let runtime = Arc::clone(self);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut accepted = false;
            let mut substeps: Vec<SubstepSpec> = Vec::new();
            loop {
                let item = tokio::select! {
                    item = subscription.rx.recv() => item,
                    () = shutdown.cancelled() => None,
                };
                match item {
                    Some(StreamItem::Event(event)) => {
                        if let EventPayload::Message { accepted: a, substeps: s, .. } = event.payload {
                            accepted |= a;
                            if !s.is_empty() {
                                substeps = s;
                            }
                        }
                    }
                    Some(StreamItem::RunCompleted { status, .. }) => {
                        let needs_tick = runtime.apply_step_terminal(
                            plan_id,
                            step_id,
                            status,
                            accepted,
                            substeps,
                        );
                        if needs_tick {
                            // Boxed so the monitor's future type does not
                            // recursively contain tick's (which spawns
                            // monitors).
                            runtime.tick_detached(plan_id).await;
                        }
                        break;
                    }
                    Some(StreamItem::RunStarted { .. }) => {}
                    None => break,
                }
            }
        });

        let request = StartRequest::new(step.task_id, step.agent_id)
            .policy_profile(step.policy_profile.clone().unwrap_or_else(|| {
                self.config.default_policy_profile.clone()
            }))
            .actor(format!("plan:{}", plan_id));
        self.start_with_id(run_id, request).await?;
        Ok(())
    }

    /// Fold one run terminal into the plan. Returns whether the caller
    /// should tick again. Synchronous: all transitions happen under the
    /// registry lock, in arrival order.
    pub(crate) fn apply_step_terminal(
        &self,
        plan_id: PlanId,
        step_id: StepId,
        run_status: RunStatus,
        accepted: bool,
        substeps: Vec<SubstepSpec>,
    ) -> bool {
        let max_team_size = self.config.max_team_size;
        let needs_tick = self.registry.update_plan(plan_id, |plan| {
            // A late terminal after the plan already ended only records
            // the step outcome; the plan status stays monotonic.
            if plan.is_terminal() {
                let step_status = match run_status {
                    RunStatus::Succeeded => StepStatus::Succeeded,
                    RunStatus::Cancelled => StepStatus::Cancelled,
                    _ => StepStatus::Failed,
                };
                if let Some(step) = plan.step_mut(step_id) {
                    let _ = step.set_status(step_status);
                }
                return false;
            }
            if plan.protocol == Protocol::PingPong {
                return apply_ping_pong(plan, step_id, run_status, accepted);
            }

            let step_status = match run_status {
                RunStatus::Succeeded => StepStatus::Succeeded,
                RunStatus::Cancelled => StepStatus::Cancelled,
                _ => StepStatus::Failed,
            };
            if let Some(step) = plan.step_mut(step_id) {
                let _ = step.set_status(step_status);
            }

            match step_status {
                StepStatus::Failed => {
                    if let Some(step) = plan.step_mut(step_id) {
                        step.error = Some("run failed".to_string());
                    }
                    match plan.failure_policy {
                        // Strict: the plan fails now; untouched work is cancelled.
                        FailurePolicy::Strict => {
                            plan.status = PlanStatus::Failed;
                            for step in &mut plan.steps {
                                if matches!(step.status, StepStatus::Pending | StepStatus::Ready) {
                                    let _ = step.set_status(StepStatus::Cancelled);
                                }
                            }
                            false
                        }
                        // Lenient: only transitive dependents are skipped.
                        FailurePolicy::Lenient => {
                            let dependents = plan.transitive_dependents(step_id);
                            for step in &mut plan.steps {
                                if dependents.contains(&step.id) && !step.status.is_terminal() {
                                    let _ = step.set_status(StepStatus::Skipped);
                                }
                            }
                            true
                        }
                    }
                }
                StepStatus::Succeeded => {
                    if plan.protocol == Protocol::Hierarchical && !substeps.is_empty() {
                        append_children(plan, step_id, substeps, max_team_size);
                    }
                    true
                }
                _ => true,
            }
        });
        needs_tick.unwrap_or(false)
    }

    /// Finalize the plan once every step is terminal.
    pub(crate) fn check_plan_completion(&self, plan_id: PlanId) {
        let completed = self.registry.update_plan(plan_id, |plan| {
            if plan.status != PlanStatus::Running || !plan.all_steps_terminal() {
                return None;
            }
            let any_failed = plan.steps.iter().any(|s| s.status == StepStatus::Failed);
            let any_cancelled = plan.steps.iter().any(|s| s.status == StepStatus::Cancelled);
            plan.status = if any_failed {
                PlanStatus::Failed
            } else if any_cancelled {
                PlanStatus::Cancelled
            } else {
                PlanStatus::Succeeded
            };
            Some((plan.status, plan.project_id))
        });
        if let Some(Some((status, project_id))) = completed {
            self.audit_action("system", "plan.completed", None, Some(project_id), AuditOutcome::Ok);
            tracing::info!(plan = %plan_id, %status, "plan completed");
        }
    }
}

fn mark_running(plan: &mut Plan, step_id: StepId) {
    if let Some(step) = plan.step_mut(step_id) {
        let _ = step.set_status(StepStatus::Running);
    }
}

/// Ping-pong bookkeeping: alternation, acceptance, and round ceiling.
fn apply_ping_pong(plan: &mut Plan, step_id: StepId, run_status: RunStatus, accepted: bool) -> bool {
    match run_status {
        RunStatus::Succeeded => {}
        RunStatus::Cancelled => {
            for step in &mut plan.steps {
                let _ = step.set_status(StepStatus::Cancelled);
            }
            plan.status = PlanStatus::Cancelled;
            return false;
        }
        _ => {
            // A terminal failure of either side ends the exchange.
            for step in &mut plan.steps {
                let _ = step.set_status(StepStatus::Failed);
            }
            if let Some(step) = plan.step_mut(step_id) {
                step.error = Some("run failed".to_string());
            }
            plan.status = PlanStatus::Failed;
            return false;
        }
    }

    if accepted {
        for step in &mut plan.steps {
            let _ = step.set_status(StepStatus::Succeeded);
        }
        plan.status = PlanStatus::Succeeded;
        return false;
    }

    let runs_done: u32 = plan.steps.iter().map(|s| s.round).sum();
    let max_rounds = plan.max_rounds.unwrap_or(1);
    if runs_done >= max_rounds * 2 {
        for step in &mut plan.steps {
            let _ = step.set_status(StepStatus::Failed);
            step.error = Some("max_rounds_reached".to_string());
        }
        plan.error = Some("max_rounds_reached".to_string());
        plan.status = PlanStatus::Failed;
        return false;
    }

    // Hand the turn back; the tick schedules the other side.
    if let Some(step) = plan.step_mut(step_id) {
        let _ = step.set_status(StepStatus::Pending);
    }
    true
}

/// Append coordinator-emitted substeps as children, bounded by the
/// configured team size.
fn append_children(plan: &mut Plan, parent: StepId, specs: Vec<SubstepSpec>, max_team_size: usize) {
    let capacity = max_team_size.saturating_sub(plan.steps.len());
    if specs.len() > capacity {
        tracing::warn!(
            plan = %plan.id,
            emitted = specs.len(),
            capacity,
            "coordinator exceeded team size; extra substeps dropped"
        );
    }
    let take = specs.len().min(capacity);
    let mut new_ids = Vec::with_capacity(take);
    for spec in specs.iter().take(take) {
        let mut step = Step::new(plan.id, spec.task_id, spec.agent_id, 0);
        step.policy_profile = spec.policy_profile.clone();
        new_ids.push(plan.push_step(step));
    }
    // Resolve child-local dependency indexes; out-of-range entries are
    // dropped rather than failing the whole plan.
    for (i, spec) in specs.iter().take(take).enumerate() {
        let deps: Vec<StepId> = spec
            .depends_on
            .iter()
            .filter_map(|&idx| new_ids.get(idx).copied())
            .filter(|dep| *dep != new_ids[i])
            .collect();
        if let Some(step) = plan.step_mut(new_ids[i]) {
            step.depends_on = deps;
        }
    }
    tracing::debug!(plan = %plan.id, parent = %parent, children = take, "substeps appended");
}
