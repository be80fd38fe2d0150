// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker bus wire protocol: queue subjects and message envelopes.
//!
//! Messages travel over a queue with per-run subjects; `worker_seq` is
//! monotonic per run and is the receiver's dedup key.

use atc_core::{AgentEvent, RunId};
use serde::{Deserialize, Serialize};

pub fn dispatch_subject(run_id: RunId) -> String {
    format!("dispatch.{}", run_id)
}

pub fn cancel_subject(run_id: RunId) -> String {
    format!("cancel.{}", run_id)
}

pub fn events_subject(run_id: RunId) -> String {
    format!("events.{}", run_id)
}

/// Envelope for worker bus messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    #[serde(rename = "dispatch")]
    Dispatch {
        run_id: RunId,
        /// Backend-specific dispatch payload (task, agent config, mode,
        /// policy profile, context pack).
        payload: serde_json::Value,
    },

    #[serde(rename = "cancel")]
    Cancel { run_id: RunId },

    #[serde(rename = "event")]
    Event {
        run_id: RunId,
        worker_seq: u64,
        event: AgentEvent,
    },
}

#[cfg(test)]
#[path = "subjects_tests.rs"]
mod tests;
