// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch bus: ack deadlines and bounded exponential backoff.

use crate::worker::{DispatchRequest, WorkerAdapter, WorkerError};
use atc_core::RunId;
use std::sync::Arc;
use std::time::Duration;

/// Retry tuning for worker dispatch.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Per-attempt acknowledgement deadline.
    pub ack_timeout: Duration,
    /// Retries after the first attempt.
    pub retry_cap: u32,
    /// First backoff delay; doubles per retry.
    pub backoff_base: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(10),
            retry_cap: 4,
            backoff_base: Duration::from_millis(250),
        }
    }
}

/// Wraps a [`WorkerAdapter`] with the dispatch retry contract: failure
/// to acknowledge within the deadline is retried with exponential
/// backoff up to a cap, after which the caller marks the run failed
/// with `dispatch_timeout`.
pub struct DispatchBus {
    adapter: Arc<dyn WorkerAdapter>,
    config: BusConfig,
}

impl DispatchBus {
    pub fn new(adapter: Arc<dyn WorkerAdapter>, config: BusConfig) -> Self {
        Self { adapter, config }
    }

    pub fn adapter(&self) -> &Arc<dyn WorkerAdapter> {
        &self.adapter
    }

    /// Dispatch with retries. Transient failures (timeout, unavailable)
    /// retry; anything else surfaces unchanged.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<(), WorkerError> {
        let mut backoff = self.config.backoff_base;
        let attempts = self.config.retry_cap + 1;
        for attempt in 1..=attempts {
            let outcome =
                tokio::time::timeout(self.config.ack_timeout, self.adapter.dispatch(request.clone()))
                    .await;
            match outcome {
                Ok(Ok(())) => {
                    if attempt > 1 {
                        tracing::info!(run = %request.run_id, attempt, "dispatch acknowledged after retry");
                    }
                    return Ok(());
                }
                Ok(Err(err @ WorkerError::UnknownBackend(_))) => return Err(err),
                Ok(Err(err)) => {
                    tracing::warn!(run = %request.run_id, attempt, %err, "dispatch attempt failed");
                }
                Err(_elapsed) => {
                    tracing::warn!(run = %request.run_id, attempt, "dispatch ack deadline elapsed");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
        }
        Err(WorkerError::AckTimeout)
    }

    /// Best-effort cancel; errors are logged, not surfaced, because the
    /// engine's grace timer covers an unresponsive worker.
    pub async fn cancel(&self, run_id: RunId) {
        if let Err(err) = self.adapter.cancel(run_id).await {
            tracing::warn!(run = %run_id, %err, "worker cancel failed; grace timer will fire");
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
