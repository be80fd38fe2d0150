// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token and dollar accounting folded from cost events.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Accumulated usage for one model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
}

/// Per-run or per-project cost summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub by_model: HashMap<String, ModelUsage>,
}

impl CostSummary {
    /// Fold one cost observation into the summary.
    pub fn add(&mut self, model: &str, tokens_in: u64, tokens_out: u64, cost_usd: f64) {
        self.tokens_in += tokens_in;
        self.tokens_out += tokens_out;
        self.cost_usd += cost_usd;
        let usage = self.by_model.entry(model.to_string()).or_default();
        usage.tokens_in += tokens_in;
        usage.tokens_out += tokens_out;
        usage.cost_usd += cost_usd;
    }

    /// Merge another summary into this one.
    pub fn merge(&mut self, other: &CostSummary) {
        self.tokens_in += other.tokens_in;
        self.tokens_out += other.tokens_out;
        self.cost_usd += other.cost_usd;
        for (model, usage) in &other.by_model {
            let mine = self.by_model.entry(model.clone()).or_default();
            mine.tokens_in += usage.tokens_in;
            mine.tokens_out += usage.tokens_out;
            mine.cost_usd += usage.cost_usd;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens_in == 0 && self.tokens_out == 0 && self.cost_usd == 0.0
    }
}

#[cfg(test)]
#[path = "cost_tests.rs"]
mod tests;
