// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run lifecycle: dispatch, event ingestion, policy gating, approval
//! suspension, cancellation, and terminal reconciliation.

use super::Runtime;
use crate::approval::{ApprovalDecision, ApprovalOutcome};
use crate::broker::StreamItem;
use crate::error::EngineError;
use atc_adapters::{DispatchBus, DispatchRequest, WorkerAdapter, WorkerEvent};
use atc_core::{
    AgentEvent, AgentId, AgentStatus, AuditOutcome, Clock, ContextPack, EventPayload, ProjectId,
    Run, RunConfig, RunId, RunStatus, TaskId, TaskStatus, TerminalStatus, ToolCall,
};
use atc_policy::{CompiledProfile, Decision, EvalContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything needed to start a run.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub policy_profile: Option<String>,
    pub mode: Option<String>,
    pub idempotency_key: Option<String>,
    pub context_pack: ContextPack,
    pub actor: String,
}

impl StartRequest {
    pub fn new(task_id: TaskId, agent_id: AgentId) -> Self {
        Self {
            task_id,
            agent_id,
            policy_profile: None,
            mode: None,
            idempotency_key: None,
            context_pack: ContextPack::default(),
            actor: "system".to_string(),
        }
    }

    atc_core::setters! {
        into {
            actor: String,
        }
        set {
            context_pack: ContextPack,
        }
        option {
            policy_profile: String,
            mode: String,
            idempotency_key: String,
        }
    }
}

/// What the consume loop does after one event.
enum LoopControl {
    Continue,
    Stop,
}

impl<C: Clock> Runtime<C> {
    /// Start a run. Idempotent on `idempotency_key`: a reused key
    /// returns the prior run untouched.
    ///
    /// Dispatch exhaustion is a run outcome, not a request error: the
    /// returned run is then already `failed(error=dispatch_timeout)`.
    pub async fn start(self: &Arc<Self>, request: StartRequest) -> Result<Run, EngineError> {
        self.start_with_id(RunId::new(), request).await
    }

    /// Start with a caller-chosen run id, so orchestrators can attach
    /// broker subscriptions before the first event can possibly flow.
    pub async fn start_with_id(
        self: &Arc<Self>,
        run_id: RunId,
        request: StartRequest,
    ) -> Result<Run, EngineError> {
        if let Some(key) = &request.idempotency_key {
            if let Some(existing) = self.registry.run_for_idempotency_key(key) {
                tracing::debug!(run = %existing.id, key = %key, "idempotency key reuse; returning prior run");
                return Ok(existing);
            }
        }

        let task = self.require_task(request.task_id)?;
        let agent = self.require_agent(request.agent_id)?;
        if agent.project_id != task.project_id {
            return Err(EngineError::Validation(format!(
                "agent {} and task {} belong to different projects",
                agent.id, task.id
            )));
        }
        if !agent.status.is_dispatchable() {
            return Err(EngineError::AgentNotIdle(agent.id, agent.status));
        }

        let profile_name = request
            .policy_profile
            .clone()
            .unwrap_or_else(|| self.config.default_policy_profile.clone());
        let compiled = self.policies.get(&profile_name)?;

        let mut run_config = RunConfig::new(task.id, agent.id, task.project_id)
            .policy_profile(profile_name);
        run_config.mode_id = request.mode.clone();
        run_config.idempotency_key = request.idempotency_key.clone();
        let run = Run::new(run_id, run_config, self.clock.epoch_ms());

        self.journal.create(run.id)?;
        self.registry.insert_run(run.clone());
        self.registry.set_agent_status(agent.id, AgentStatus::Busy);
        self.registry.set_task_status(task.id, TaskStatus::Running);
        self.audit_action(
            &request.actor,
            "run.start",
            Some(run.id),
            Some(task.project_id),
            AuditOutcome::Ok,
        );

        let adapter = self.workers.get(&agent.backend_kind)?;
        let rx = adapter.subscribe(run.id);
        let bus = DispatchBus::new(Arc::clone(&adapter), self.bus_config());
        let dispatch = DispatchRequest {
            run_id: run.id,
            task,
            agent,
            mode: request.mode,
            policy_profile: run.policy_profile.clone(),
            context_pack: request.context_pack,
        };

        if let Err(err) = bus.dispatch(dispatch).await {
            tracing::warn!(run = %run.id, %err, "dispatch exhausted; failing run");
            self.fail_run(run.id, run.project_id, "dispatch_timeout")?;
            return self.require_run(run.id);
        }

        self.registry.update_run(run.id, |r| r.transition(RunStatus::Running)).transpose()?;
        self.broker
            .publish_notice(run.project_id, run.id, StreamItem::RunStarted { run_id: run.id });

        let runtime = Arc::clone(self);
        let project_id = run.project_id;
        tokio::spawn(async move {
            runtime.run_loop(run_id, project_id, adapter, compiled, rx).await;
        });

        self.require_run(run.id)
    }

    /// Consume the worker's event stream until a terminal event or
    /// shutdown. This loop is the single writer for the run, which
    /// gives per-run linearizability without extra locking.
    pub(crate) async fn run_loop(
        self: Arc<Self>,
        run_id: RunId,
        project_id: ProjectId,
        adapter: Arc<dyn WorkerAdapter>,
        compiled: Arc<CompiledProfile>,
        mut rx: mpsc::UnboundedReceiver<WorkerEvent>,
    ) {
        let cancel = self.run_token(run_id);
        loop {
            let message = tokio::select! {
                message = rx.recv() => message,
                // Shutdown: leave the run for restart reconciliation.
                () = cancel.cancelled() => None,
            };
            let Some(message) = message else { break };

            // Dedup on (run_id, worker_seq): replays from the worker are
            // dropped before they can reach the journal.
            let fresh = self
                .registry
                .update_run(run_id, |run| {
                    if message.worker_seq <= run.worker_high_seq {
                        false
                    } else {
                        run.worker_high_seq = message.worker_seq;
                        true
                    }
                })
                .unwrap_or(false);
            if !fresh {
                tracing::trace!(run = %run_id, worker_seq = message.worker_seq, "duplicate worker event dropped");
                continue;
            }

            match self
                .process_worker_event(run_id, project_id, &adapter, &compiled, message.event, &cancel)
                .await
            {
                Ok(LoopControl::Continue) => {}
                Ok(LoopControl::Stop) => break,
                Err(err) => {
                    tracing::error!(run = %run_id, %err, "event processing failed");
                    if self.journal.is_terminal(run_id) {
                        break;
                    }
                }
            }
        }
    }

    async fn process_worker_event(
        self: &Arc<Self>,
        run_id: RunId,
        project_id: ProjectId,
        adapter: &Arc<dyn WorkerAdapter>,
        compiled: &Arc<CompiledProfile>,
        event: AgentEvent,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<LoopControl, EngineError> {
        match event.payload.clone() {
            EventPayload::ToolCall { call } => {
                self.handle_tool_call(run_id, project_id, adapter, compiled, event, call, cancel)
                    .await
            }
            EventPayload::Terminal { status, reason, output } => {
                self.append_and_publish(project_id, event)?;
                self.reconcile_terminal(run_id, project_id, status, reason, output)?;
                Ok(LoopControl::Stop)
            }
            EventPayload::Cost { model, tokens_in, tokens_out, cost_usd } => {
                self.append_and_publish(project_id, event)?;
                self.registry.update_run(run_id, |run| {
                    run.tokens_in += tokens_in;
                    run.tokens_out += tokens_out;
                    run.cost_usd += cost_usd;
                    run.model = Some(model);
                });
                Ok(LoopControl::Continue)
            }
            _ => {
                self.append_and_publish(project_id, event)?;
                Ok(LoopControl::Continue)
            }
        }
    }

    /// Policy gate for one tool call: allow appends, deny blocks with a
    /// synthetic result, ask suspends until resolved.
    #[allow(clippy::too_many_arguments)]
    async fn handle_tool_call(
        self: &Arc<Self>,
        run_id: RunId,
        project_id: ProjectId,
        adapter: &Arc<dyn WorkerAdapter>,
        compiled: &Arc<CompiledProfile>,
        event: AgentEvent,
        call: ToolCall,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<LoopControl, EngineError> {
        let run = self.require_run(run_id)?;
        let ctx = EvalContext {
            step_count: run.step_count,
            cost_usd: run.cost_usd,
            elapsed_ms: self.clock.epoch_ms().saturating_sub(run.started_at_ms),
        };
        let eval = compiled.evaluate(&call, &ctx);
        tracing::debug!(
            run = %run_id,
            tool = %call.tool,
            decision = %eval.decision,
            rule = ?eval.matched_rule,
            "tool call evaluated"
        );

        match eval.decision {
            Decision::Allow => {
                self.accept_tool_call(run_id, project_id, event)?;
                Ok(LoopControl::Continue)
            }
            Decision::Deny => {
                self.deny_tool_call(run_id, project_id, event, &call, &eval.reason, eval.deny_terminates)
            }
            Decision::Ask => {
                let call_id = call.call_id.clone();
                let (task_id, agent_id) = (event.task_id, event.agent_id);
                self.append_and_publish(
                    project_id,
                    AgentEvent::new(
                        run_id,
                        task_id,
                        agent_id,
                        self.clock.epoch_ms(),
                        EventPayload::ApprovalRequested {
                            call_id: call_id.clone(),
                            reason: eval.reason.clone(),
                        },
                    ),
                )?;
                self.registry
                    .update_run(run_id, |r| r.transition(RunStatus::AwaitingApproval))
                    .transpose()?;

                let handle = self.approvals.request(run_id, &call_id)?;
                if let Err(err) = adapter.pause(run_id).await {
                    tracing::warn!(run = %run_id, %err, "worker pause failed");
                }

                let timeout = Duration::from_millis(self.config.approval_timeout_ms);
                let outcome = handle.wait(timeout, cancel).await;
                tracing::info!(run = %run_id, call = %call_id, %outcome, "approval resolved");

                match outcome {
                    ApprovalOutcome::Allow => {
                        self.registry
                            .update_run(run_id, |r| r.transition(RunStatus::Running))
                            .transpose()?;
                        if let Err(err) = adapter.resume(run_id).await {
                            tracing::warn!(run = %run_id, %err, "worker resume failed");
                        }
                        self.accept_tool_call(run_id, project_id, event)?;
                        Ok(LoopControl::Continue)
                    }
                    ApprovalOutcome::Deny => {
                        self.registry
                            .update_run(run_id, |r| r.transition(RunStatus::Running))
                            .transpose()?;
                        if let Err(err) = adapter.resume(run_id).await {
                            tracing::warn!(run = %run_id, %err, "worker resume failed");
                        }
                        self.deny_tool_call(
                            run_id,
                            project_id,
                            event,
                            &call,
                            "denied by user",
                            eval.deny_terminates,
                        )
                    }
                    ApprovalOutcome::Timeout => {
                        self.fail_run(run_id, project_id, "approval_timeout")?;
                        Ok(LoopControl::Stop)
                    }
                    // Run-level cancel in flight: the cancel path (worker
                    // terminal or grace timer) finishes the run.
                    ApprovalOutcome::Cancelled => Ok(LoopControl::Continue),
                }
            }
        }
    }

    /// Append an allowed tool call and count it as a step.
    fn accept_tool_call(
        &self,
        run_id: RunId,
        project_id: ProjectId,
        event: AgentEvent,
    ) -> Result<(), EngineError> {
        self.append_and_publish(project_id, event)?;
        self.registry.update_run(run_id, |run| run.step_count += 1);
        Ok(())
    }

    /// Append the denied call plus a synthetic blocked result; fail the
    /// run when the profile says a deny terminates it.
    fn deny_tool_call(
        &self,
        run_id: RunId,
        project_id: ProjectId,
        event: AgentEvent,
        call: &ToolCall,
        reason: &str,
        terminates: bool,
    ) -> Result<LoopControl, EngineError> {
        let (task_id, agent_id) = (event.task_id, event.agent_id);
        let appended = self.append_and_publish(project_id, event)?;
        let blocked = AgentEvent::new(
            run_id,
            task_id,
            agent_id,
            self.clock.epoch_ms(),
            EventPayload::ToolResult {
                call_id: call.call_id.clone(),
                ok: false,
                blocked: true,
                reason: Some(reason.to_string()),
                output: None,
            },
        )
        .with_parent(appended.id);
        self.append_and_publish(project_id, blocked)?;

        if terminates {
            self.fail_run(run_id, project_id, "policy_deny")?;
            return Ok(LoopControl::Stop);
        }
        Ok(LoopControl::Continue)
    }

    /// Synthesize a failed terminal event and reconcile.
    pub(crate) fn fail_run(
        &self,
        run_id: RunId,
        project_id: ProjectId,
        reason: &str,
    ) -> Result<(), EngineError> {
        let run = self.require_run(run_id)?;
        let terminal = AgentEvent::new(
            run_id,
            run.task_id,
            run.agent_id,
            self.clock.epoch_ms(),
            EventPayload::Terminal {
                status: TerminalStatus::Failed,
                reason: Some(reason.to_string()),
                output: None,
            },
        );
        // A worker terminal may have raced us; the journal's terminal
        // guard keeps exactly one.
        match self.journal.append(terminal) {
            Ok(appended) => self.broker.publish_event(project_id, &appended),
            Err(atc_storage::JournalError::Terminal(_)) => return Ok(()),
            Err(err) => return Err(err.into()),
        }
        self.reconcile_terminal(run_id, project_id, TerminalStatus::Failed, Some(reason.to_string()), None)
    }

    /// Terminal reconciliation: fold final cost, persist output/error,
    /// release the agent, publish `run.completed`, resolve leftovers.
    pub(crate) fn reconcile_terminal(
        &self,
        run_id: RunId,
        project_id: ProjectId,
        status: TerminalStatus,
        reason: Option<String>,
        output: Option<String>,
    ) -> Result<(), EngineError> {
        let stats = self.journal.stats(run_id)?;
        let now = self.clock.epoch_ms();
        let error = match status {
            TerminalStatus::Succeeded => None,
            _ => reason,
        };
        let finalized = self
            .registry
            .update_run(run_id, |run| {
                run.finalize(status, error.clone(), output.clone(), now)?;
                run.cost_usd = stats.cost_usd;
                run.tokens_in = stats.tokens_in;
                run.tokens_out = stats.tokens_out;
                Ok::<_, atc_core::IllegalTransition>(run.clone())
            })
            .ok_or(EngineError::RunNotFound(run_id))??;

        self.registry.set_task_status(
            finalized.task_id,
            match status {
                TerminalStatus::Succeeded => TaskStatus::Succeeded,
                TerminalStatus::Failed => TaskStatus::Failed,
                TerminalStatus::Cancelled => TaskStatus::Cancelled,
            },
        );
        self.registry.set_agent_status(finalized.agent_id, AgentStatus::Idle);
        self.approvals.cancel_run(run_id);
        self.broker.publish_notice(
            project_id,
            run_id,
            StreamItem::RunCompleted { run_id, status: finalized.status },
        );
        self.drop_run_token(run_id);
        tracing::info!(run = %run_id, %status, cost_usd = finalized.cost_usd, "run completed");
        Ok(())
    }

    /// Cancel a run. Success on an already-terminal run, without state
    /// change. Arms a grace timer; if the worker stays silent the
    /// engine synthesizes the terminal itself.
    pub async fn cancel_run(self: &Arc<Self>, run_id: RunId, actor: &str) -> Result<Run, EngineError> {
        let run = self.require_run(run_id)?;
        if run.is_terminal() {
            return Ok(run);
        }
        self.registry
            .update_run(run_id, |r| r.transition(RunStatus::Cancelling))
            .transpose()?;
        self.audit_action(actor, "run.cancel", Some(run_id), Some(run.project_id), AuditOutcome::Ok);

        // Wake any approval waiter as cancelled before touching the worker.
        self.approvals.cancel_run(run_id);

        let agent = self.require_agent(run.agent_id)?;
        let adapter = self.workers.get(&agent.backend_kind)?;
        let bus = DispatchBus::new(adapter, self.bus_config());
        bus.cancel(run_id).await;

        let runtime = Arc::clone(self);
        let project_id = run.project_id;
        let grace = Duration::from_millis(self.config.cancel_grace_ms);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(grace) => {}
                () = shutdown.cancelled() => return,
            }
            let still_live = runtime
                .registry
                .get_run(run_id)
                .map(|r| !r.is_terminal())
                .unwrap_or(false);
            if !still_live {
                return;
            }
            tracing::warn!(run = %run_id, "cancel grace elapsed; synthesizing terminal");
            if let Err(err) = runtime.synthesize_cancelled(run_id, project_id) {
                tracing::error!(run = %run_id, %err, "synthesized cancel failed");
            }
        });

        self.require_run(run_id)
    }

    fn synthesize_cancelled(&self, run_id: RunId, project_id: ProjectId) -> Result<(), EngineError> {
        let run = self.require_run(run_id)?;
        let terminal = AgentEvent::new(
            run_id,
            run.task_id,
            run.agent_id,
            self.clock.epoch_ms(),
            EventPayload::Terminal {
                status: TerminalStatus::Cancelled,
                reason: Some("cancel_grace_elapsed".to_string()),
                output: None,
            },
        );
        match self.journal.append(terminal) {
            Ok(appended) => self.broker.publish_event(project_id, &appended),
            Err(atc_storage::JournalError::Terminal(_)) => return Ok(()),
            Err(err) => return Err(err.into()),
        }
        self.reconcile_terminal(
            run_id,
            project_id,
            TerminalStatus::Cancelled,
            Some("cancel_grace_elapsed".to_string()),
            None,
        )
    }

    /// Deliver an approval decision. Returns whether a waiter consumed
    /// it; a second resolve of the same call returns `false`.
    pub fn resolve_approval(
        &self,
        run_id: RunId,
        call_id: &str,
        decision: ApprovalDecision,
        actor: &str,
    ) -> bool {
        let consumed = self.approvals.resolve(run_id, call_id, decision);
        let project_id = self.registry.get_run(run_id).map(|r| r.project_id);
        self.audit_action(
            actor,
            "run.approve",
            Some(run_id),
            project_id,
            if consumed { AuditOutcome::Ok } else { AuditOutcome::Error },
        );
        consumed
    }
}
