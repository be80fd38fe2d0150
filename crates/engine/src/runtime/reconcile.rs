// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery: rebuild run rows from journals, then reconcile
//! in-flight state left behind by the previous process.
//!
//! Pending approvals do not survive a restart, so orphaned
//! `awaiting_approval` runs fail with `approval_lost`. Other
//! non-terminal runs older than the staleness threshold fail with
//! `process_restart`.

use super::Runtime;
use crate::error::EngineError;
use atc_core::{
    Clock, EventPayload, Run, RunConfig, RunStatus, TerminalStatus,
};

/// What recovery did, for startup logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Run rows reconstructed from journal files.
    pub rebuilt: usize,
    /// Runs failed with `approval_lost`.
    pub approval_lost: usize,
    /// Runs failed with `process_restart`.
    pub process_restart: usize,
}

impl<C: Clock> Runtime<C> {
    /// Rebuild missing registry state from the journal, then reconcile
    /// orphaned runs. Call once at startup, before accepting requests.
    pub fn recover(&self) -> Result<RecoveryReport, EngineError> {
        let rebuilt = self.rebuild_from_journal()?;
        let (approval_lost, process_restart) = self.reconcile_orphans()?;
        let report = RecoveryReport { rebuilt, approval_lost, process_restart };
        tracing::info!(
            rebuilt = report.rebuilt,
            approval_lost = report.approval_lost,
            process_restart = report.process_restart,
            "startup recovery complete"
        );
        Ok(report)
    }

    /// Reconstruct run rows for journal files the snapshot did not
    /// cover. Events carry the identifiers needed to rebuild a usable
    /// row; the profile falls back to the configured default.
    fn rebuild_from_journal(&self) -> Result<usize, EngineError> {
        let mut rebuilt = 0usize;
        for run_id in self.journal.run_ids() {
            if self.registry.get_run(run_id).is_some() {
                continue;
            }
            let events = self.journal.load_by_run(run_id)?;
            let Some(first) = events.first() else { continue };

            let mut config = RunConfig::new(first.task_id, first.agent_id, derive_project(self));
            config.policy_profile = self.config.default_policy_profile.clone();
            let mut run = Run::new(run_id, config, first.at_ms);
            run.status = RunStatus::Running;

            for event in &events {
                match &event.payload {
                    EventPayload::Cost { model, tokens_in, tokens_out, cost_usd } => {
                        run.tokens_in += tokens_in;
                        run.tokens_out += tokens_out;
                        run.cost_usd += cost_usd;
                        run.model = Some(model.clone());
                    }
                    EventPayload::ToolCall { .. } => run.step_count += 1,
                    EventPayload::Terminal { status, reason, output } => {
                        run.status = (*status).into();
                        run.ended_at_ms = Some(event.at_ms);
                        run.error = reason.clone();
                        run.output = output.clone();
                    }
                    _ => {}
                }
            }
            tracing::debug!(run = %run_id, status = %run.status, "run row rebuilt from journal");
            self.registry.insert_run(run);
            rebuilt += 1;
        }
        Ok(rebuilt)
    }

    /// Fail orphaned in-flight runs per the restart contract.
    fn reconcile_orphans(&self) -> Result<(usize, usize), EngineError> {
        let now = self.clock.epoch_ms();
        let threshold = self.config.stale_run_threshold_ms;
        let mut approval_lost = 0usize;
        let mut process_restart = 0usize;

        for run in self.registry.non_terminal_runs() {
            let reason = if run.status == RunStatus::AwaitingApproval {
                approval_lost += 1;
                "approval_lost"
            } else if now.saturating_sub(run.started_at_ms) >= threshold {
                process_restart += 1;
                "process_restart"
            } else {
                continue;
            };
            tracing::warn!(run = %run.id, status = %run.status, reason, "reconciling orphaned run");
            self.fail_orphan(&run, reason)?;
        }
        Ok((approval_lost, process_restart))
    }

    fn fail_orphan(&self, run: &Run, reason: &str) -> Result<(), EngineError> {
        // The journal may already hold a terminal the old process never
        // folded into the registry; prefer the worker's own verdict.
        if let Some(last) = self.journal.last_event(run.id)? {
            if let EventPayload::Terminal { status, reason: r, output } = last.payload {
                return self.reconcile_terminal(run.id, run.project_id, status, r, output);
            }
        }
        let terminal = atc_core::AgentEvent::new(
            run.id,
            run.task_id,
            run.agent_id,
            self.clock.epoch_ms(),
            EventPayload::Terminal {
                status: TerminalStatus::Failed,
                reason: Some(reason.to_string()),
                output: None,
            },
        );
        match self.journal.append(terminal) {
            Ok(appended) => self.broker.publish_event(run.project_id, &appended),
            Err(atc_storage::JournalError::Terminal(_)) => {}
            Err(err) => return Err(err.into()),
        }
        self.reconcile_terminal(
            run.id,
            run.project_id,
            TerminalStatus::Failed,
            Some(reason.to_string()),
            None,
        )
    }
}

/// Journal events do not record the project; reconstruction uses the
/// lone registered project when there is exactly one, a fresh id
/// otherwise (queries by project simply skip such runs).
fn derive_project<C: Clock>(runtime: &Runtime<C>) -> atc_core::ProjectId {
    runtime.registry.read(|s| {
        let mut ids = s.projects.values().map(|p| p.id);
        match (ids.next(), ids.next()) {
            (Some(only), None) => only,
            _ => atc_core::ProjectId::new(),
        }
    })
}
