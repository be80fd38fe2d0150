// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-backend capability set and factory registry.

use atc_core::{Agent, AgentEvent, ContextPack, RunId, Task};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Worker transport failures.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker did not acknowledge dispatch within the deadline")]
    AckTimeout,
    #[error("worker backend '{0}' is not registered")]
    UnknownBackend(String),
    #[error("worker unavailable: {0}")]
    Unavailable(String),
    #[error("worker stream for run {0} is closed")]
    StreamClosed(RunId),
}

impl WorkerError {
    pub fn kind(&self) -> atc_core::ErrorKind {
        match self {
            WorkerError::AckTimeout => atc_core::ErrorKind::Timeout,
            WorkerError::UnknownBackend(_) => atc_core::ErrorKind::Validation,
            WorkerError::Unavailable(_) | WorkerError::StreamClosed(_) => {
                atc_core::ErrorKind::DependencyUnavailable
            }
        }
    }
}

/// One message on a run's event stream.
///
/// `worker_seq` is monotonic per run and is the dedup key: the run
/// engine drops any message whose seq it has already accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerEvent {
    pub worker_seq: u64,
    pub event: AgentEvent,
}

/// Everything a worker needs to start an agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub run_id: RunId,
    pub task: Task,
    pub agent: Agent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub policy_profile: String,
    #[serde(default, skip_serializing_if = "ContextPack::is_empty")]
    pub context_pack: ContextPack,
}

/// Capability set required of every worker backend.
///
/// Events are the canonical source of truth; dispatch returns once the
/// worker has acknowledged, and cancel is best-effort (the engine arms
/// its own grace timer).
#[async_trait::async_trait]
pub trait WorkerAdapter: std::fmt::Debug + Send + Sync + 'static {
    /// Backend registry key (e.g. "claude-code").
    fn kind(&self) -> &str;

    /// Open the run's event stream. Must be called before `dispatch`
    /// so no event is lost.
    fn subscribe(&self, run_id: RunId) -> mpsc::UnboundedReceiver<WorkerEvent>;

    /// Hand off an invocation; resolves on worker acknowledgement.
    async fn dispatch(&self, request: DispatchRequest) -> Result<(), WorkerError>;

    /// Ask the worker to stop; it should emit a terminal event within
    /// the grace period.
    async fn cancel(&self, run_id: RunId) -> Result<(), WorkerError>;

    /// Advisory pause while an approval is pending.
    async fn pause(&self, run_id: RunId) -> Result<(), WorkerError>;

    /// Resume after an approval decision.
    async fn resume(&self, run_id: RunId) -> Result<(), WorkerError>;
}

/// Process-wide factory registry of worker backends, keyed by name.
///
/// Initialised once at startup, read-only at runtime.
#[derive(Default)]
pub struct WorkerRegistry {
    backends: HashMap<String, Arc<dyn WorkerAdapter>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn WorkerAdapter>) {
        self.backends.insert(adapter.kind().to_string(), adapter);
    }

    pub fn get(&self, kind: &str) -> Result<Arc<dyn WorkerAdapter>, WorkerError> {
        self.backends
            .get(kind)
            .cloned()
            .ok_or_else(|| WorkerError::UnknownBackend(kind.to_string()))
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
