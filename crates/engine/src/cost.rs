// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cost aggregation: fold cost events into run and project summaries.

use crate::error::EngineError;
use crate::registry::Registry;
use atc_core::{CostSummary, EventPayload, ProjectId, RunId};
use atc_storage::EventJournal;
use std::sync::Arc;

/// Folds token/tool cost events into per-run and per-project summaries.
pub struct CostAggregator {
    journal: Arc<EventJournal>,
    registry: Arc<Registry>,
}

impl CostAggregator {
    pub fn new(journal: Arc<EventJournal>, registry: Arc<Registry>) -> Self {
        Self { journal, registry }
    }

    /// Per-run summary folded from the run's journal.
    pub fn run_summary(&self, run_id: RunId) -> Result<CostSummary, EngineError> {
        let mut summary = CostSummary::default();
        for event in self.journal.load_by_run(run_id)? {
            if let EventPayload::Cost { model, tokens_in, tokens_out, cost_usd } = &event.payload
            {
                summary.add(model, *tokens_in, *tokens_out, *cost_usd);
            }
        }
        Ok(summary)
    }

    /// Per-project summary across all of the project's runs.
    pub fn project_summary(&self, project_id: ProjectId) -> Result<CostSummary, EngineError> {
        let mut summary = CostSummary::default();
        for run in self.registry.runs_for_project(project_id) {
            if self.journal.contains(run.id) {
                summary.merge(&self.run_summary(run.id)?);
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "cost_tests.rs"]
mod tests;
