// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session manager and replay: derived runs built from journal prefixes.
//!
//! All four kinds copy a parent prefix into a fresh run; the parent is
//! never modified. Resume and replay additionally re-dispatch the new
//! head to the worker.

use super::Runtime;
use crate::broker::StreamItem;
use crate::error::EngineError;
use atc_adapters::{DispatchBus, DispatchRequest};
use atc_core::{
    AgentEvent, AgentStatus, AuditOutcome, Clock, ContextPack, EventId, Run, RunConfig, RunId,
    RunStatus, Session, SessionKind, SessionStatus,
};
use std::sync::Arc;

impl<C: Clock> Runtime<C> {
    /// Fork: independent copy of the parent's prefix up to and
    /// including `cutoff`. The new head stays queued.
    pub fn fork(&self, parent: RunId, cutoff: EventId, actor: &str) -> Result<Session, EngineError> {
        let (_, session) = self.derive(parent, SessionKind::Fork, Some(cutoff), actor)?;
        Ok(session)
    }

    /// Rewind: logical truncation via prefix copy; the parent keeps its
    /// full history.
    pub fn rewind(&self, parent: RunId, cutoff: EventId, actor: &str) -> Result<Session, EngineError> {
        let (_, session) = self.derive(parent, SessionKind::Rewind, Some(cutoff), actor)?;
        Ok(session)
    }

    /// Resume: continue from the parent's last checkpoint on a fresh
    /// run, dispatched to the worker.
    pub async fn resume(self: &Arc<Self>, parent: RunId, actor: &str) -> Result<Session, EngineError> {
        let (run, session) = self.derive(parent, SessionKind::Resume, None, actor)?;
        self.dispatch_derived(run, session).await
    }

    /// Replay: deterministic re-execution from a chosen checkpoint.
    /// Worker non-determinism is the caller's concern, not the engine's.
    pub async fn replay(
        self: &Arc<Self>,
        parent: RunId,
        checkpoint: EventId,
        actor: &str,
    ) -> Result<Session, EngineError> {
        let events = self.journal.load_by_run(parent)?;
        let is_checkpoint = events.iter().any(|e| e.id == checkpoint && e.checkpoint);
        if !is_checkpoint {
            return Err(EngineError::Validation(format!(
                "event {} is not a checkpoint of run {}",
                checkpoint, parent
            )));
        }
        let (run, session) = self.derive(parent, SessionKind::Replay, Some(checkpoint), actor)?;
        self.dispatch_derived(run, session).await
    }

    /// Copy a parent prefix into a new run and record the session.
    ///
    /// `cutoff`: explicit cutoff event, or `None` for "last checkpoint"
    /// (resume semantics).
    fn derive(
        &self,
        parent: RunId,
        kind: SessionKind,
        cutoff: Option<EventId>,
        actor: &str,
    ) -> Result<(Run, Session), EngineError> {
        let parent_run = self.require_run(parent)?;
        let events = self.journal.load_by_run(parent)?;
        let cutoff_event: &AgentEvent = match cutoff {
            Some(id) => events
                .iter()
                .find(|e| e.id == id)
                .ok_or_else(|| EngineError::Validation(format!(
                    "cutoff event {} not found in run {}",
                    id, parent
                )))?,
            None => events
                .iter()
                .rev()
                .find(|e| e.checkpoint)
                .ok_or_else(|| EngineError::Validation(format!(
                    "run {} has no checkpoint to resume from",
                    parent
                )))?,
        };

        let mut run_config = RunConfig::new(
            parent_run.task_id,
            parent_run.agent_id,
            parent_run.project_id,
        )
        .policy_profile(parent_run.policy_profile.clone());
        run_config.mode_id = parent_run.mode_id.clone();
        let new_run = Run::new(RunId::new(), run_config, self.clock.epoch_ms());

        self.journal.copy_prefix(parent, new_run.id, cutoff_event.seq)?;
        self.registry.insert_run(new_run.clone());

        let session = Session::new(
            parent,
            kind,
            cutoff_event.id,
            cutoff_event.seq,
            new_run.id,
            self.clock.epoch_ms(),
        );
        self.registry.insert_session(session.clone());
        self.audit_action(
            actor,
            &format!("session.{}", kind),
            Some(parent),
            Some(parent_run.project_id),
            AuditOutcome::Ok,
        );
        tracing::info!(
            %parent,
            new_run = %new_run.id,
            %kind,
            cutoff_seq = cutoff_event.seq,
            "derived run created"
        );
        Ok((new_run, session))
    }

    /// Dispatch a derived head to the worker and attach its run loop.
    async fn dispatch_derived(
        self: &Arc<Self>,
        run: Run,
        mut session: Session,
    ) -> Result<Session, EngineError> {
        let task = self.require_task(run.task_id)?;
        let agent = self.require_agent(run.agent_id)?;
        if !agent.status.is_dispatchable() {
            return Err(EngineError::AgentNotIdle(agent.id, agent.status));
        }
        let compiled = self.policies.get(&run.policy_profile)?;
        self.registry.set_agent_status(agent.id, AgentStatus::Busy);

        let adapter = self.workers.get(&agent.backend_kind)?;
        let rx = adapter.subscribe(run.id);
        let bus = DispatchBus::new(Arc::clone(&adapter), self.bus_config());
        let dispatch = DispatchRequest {
            run_id: run.id,
            task,
            agent,
            mode: run.mode_id.clone(),
            policy_profile: run.policy_profile.clone(),
            context_pack: ContextPack::default(),
        };

        if let Err(err) = bus.dispatch(dispatch).await {
            tracing::warn!(run = %run.id, %err, "derived dispatch exhausted");
            self.fail_run(run.id, run.project_id, "dispatch_timeout")?;
            session.status = SessionStatus::Failed;
            self.registry.insert_session(session.clone());
            return Ok(session);
        }

        self.registry.update_run(run.id, |r| r.transition(RunStatus::Running)).transpose()?;
        self.broker
            .publish_notice(run.project_id, run.id, StreamItem::RunStarted { run_id: run.id });

        let runtime = Arc::clone(self);
        let (run_id, project_id) = (run.id, run.project_id);
        tokio::spawn(async move {
            runtime.run_loop(run_id, project_id, adapter, compiled, rx).await;
        });

        session.status = SessionStatus::Dispatched;
        self.registry.insert_session(session.clone());
        Ok(session)
    }
}
