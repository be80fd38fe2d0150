// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval registry: in-memory waiters for `ask` decisions.
//!
//! A pending approval suspends its run until a user resolves it, the
//! wait times out, or the run is cancelled. Waiters do not survive a
//! process restart; startup reconciliation fails orphaned
//! `awaiting_approval` runs with `approval_lost`.

use crate::error::EngineError;
use atc_core::RunId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// User-supplied resolution for a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Allow,
    Deny,
}

/// What the waiting run observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Allow,
    Deny,
    Timeout,
    Cancelled,
}

atc_core::simple_display! {
    ApprovalOutcome {
        Allow => "allow",
        Deny => "deny",
        Timeout => "timeout",
        Cancelled => "cancelled",
    }
}

/// Handle returned to the suspended run.
#[derive(Debug)]
pub struct ApprovalHandle {
    rx: oneshot::Receiver<ApprovalDecision>,
}

impl ApprovalHandle {
    /// Wait for resolution, a timeout, or cancellation.
    pub async fn wait(self, timeout: Duration, cancel: &CancellationToken) -> ApprovalOutcome {
        tokio::select! {
            decision = self.rx => match decision {
                Ok(ApprovalDecision::Allow) => ApprovalOutcome::Allow,
                Ok(ApprovalDecision::Deny) => ApprovalOutcome::Deny,
                // Sender dropped without a decision: run-level cancel.
                Err(_) => ApprovalOutcome::Cancelled,
            },
            () = cancel.cancelled() => ApprovalOutcome::Cancelled,
            () = tokio::time::sleep(timeout) => ApprovalOutcome::Timeout,
        }
    }
}

/// Process-wide map of pending `(run_id, call_id)` waiters.
#[derive(Default)]
pub struct ApprovalRegistry {
    pending: Mutex<HashMap<(RunId, String), oneshot::Sender<ApprovalDecision>>>,
}

impl ApprovalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending approval. Conflicts if one already exists
    /// for the same `(run_id, call_id)`.
    pub fn request(&self, run_id: RunId, call_id: &str) -> Result<ApprovalHandle, EngineError> {
        let mut pending = self.pending.lock();
        let key = (run_id, call_id.to_string());
        if pending.contains_key(&key) {
            return Err(EngineError::DuplicateApproval { run_id, call_id: call_id.to_string() });
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(key, tx);
        Ok(ApprovalHandle { rx })
    }

    /// Deliver a decision. Returns `true` if a waiter consumed it;
    /// `false` (idempotently) when none existed.
    pub fn resolve(&self, run_id: RunId, call_id: &str, decision: ApprovalDecision) -> bool {
        let sender = self.pending.lock().remove(&(run_id, call_id.to_string()));
        match sender {
            Some(tx) => tx.send(decision).is_ok(),
            None => false,
        }
    }

    /// Resolve all pending approvals for a run as cancelled (the
    /// dropped sender wakes each waiter with `Cancelled`).
    pub fn cancel_run(&self, run_id: RunId) {
        let mut pending = self.pending.lock();
        pending.retain(|(rid, _), _| *rid != run_id);
    }

    /// Pending call ids for a run, for status queries.
    pub fn pending_calls(&self, run_id: RunId) -> Vec<String> {
        let mut calls: Vec<String> = self
            .pending
            .lock()
            .keys()
            .filter(|(rid, _)| *rid == run_id)
            .map(|(_, call_id)| call_id.clone())
            .collect();
        calls.sort();
        calls
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
