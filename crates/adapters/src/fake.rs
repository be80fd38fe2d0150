// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable in-process worker for tests.
//!
//! Scripts are keyed by task id (run ids are not known until start).
//! On dispatch the whole script is pushed onto the run's event stream;
//! the run engine serialises consumption, so ordering stays
//! deterministic even across approval suspensions.

use crate::worker::{DispatchRequest, WorkerAdapter, WorkerError, WorkerEvent};
use atc_core::{AgentEvent, AgentId, EventPayload, RunId, TaskId, TerminalStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default, Debug)]
struct FakeState {
    scripts: HashMap<TaskId, Vec<EventPayload>>,
    streams: HashMap<RunId, mpsc::UnboundedSender<WorkerEvent>>,
    next_seq: HashMap<RunId, u64>,
    identities: HashMap<RunId, (TaskId, AgentId)>,
    calls: Vec<(RunId, &'static str)>,
    fail_dispatches: u32,
    hang_dispatches: u32,
    duplicate_seqs: bool,
    emit_terminal_on_cancel: bool,
    dispatch_count: u32,
}

/// Fake worker backend with scripted event streams.
#[derive(Clone, Debug)]
pub struct FakeWorker {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWorker {
    pub fn new() -> Self {
        let state = FakeState { emit_terminal_on_cancel: true, ..FakeState::default() };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Script the events emitted when a run of this task is dispatched.
    pub fn script_task(&self, task_id: TaskId, payloads: Vec<EventPayload>) {
        self.state.lock().scripts.insert(task_id, payloads);
    }

    /// Fail the next `n` dispatch acknowledgements with `Unavailable`.
    pub fn fail_dispatches(&self, n: u32) {
        self.state.lock().fail_dispatches = n;
    }

    /// Never acknowledge the next `n` dispatches (ack deadline testing).
    pub fn hang_dispatches(&self, n: u32) {
        self.state.lock().hang_dispatches = n;
    }

    /// Emit every scripted event twice with the same worker_seq.
    pub fn duplicate_seqs(&self, enabled: bool) {
        self.state.lock().duplicate_seqs = enabled;
    }

    /// Whether cancel emits a `terminal(cancelled)` event (default true).
    /// Disable to exercise the engine's grace timer.
    pub fn emit_terminal_on_cancel(&self, enabled: bool) {
        self.state.lock().emit_terminal_on_cancel = enabled;
    }

    /// Recorded control calls, in order: `(run_id, "cancel"|"pause"|"resume")`.
    pub fn calls(&self) -> Vec<(RunId, &'static str)> {
        self.state.lock().calls.clone()
    }

    /// Number of dispatch attempts observed.
    pub fn dispatch_count(&self) -> u32 {
        self.state.lock().dispatch_count
    }

    /// Push one extra event onto a live run's stream (mid-run injection).
    pub fn emit(&self, run_id: RunId, payload: EventPayload) {
        let mut state = self.state.lock();
        let Some((task_id, agent_id)) = state.identities.get(&run_id).copied() else {
            return;
        };
        let seq = {
            let next = state.next_seq.entry(run_id).or_insert(1);
            let seq = *next;
            *next += 1;
            seq
        };
        let at_ms = 1_000 + seq;
        let event = AgentEvent::new(run_id, task_id, agent_id, at_ms, payload);
        if let Some(tx) = state.streams.get(&run_id) {
            let _ = tx.send(WorkerEvent { worker_seq: seq, event });
        }
    }
}

#[async_trait::async_trait]
impl WorkerAdapter for FakeWorker {
    fn kind(&self) -> &str {
        "fake"
    }

    fn subscribe(&self, run_id: RunId) -> mpsc::UnboundedReceiver<WorkerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().streams.insert(run_id, tx);
        rx
    }

    async fn dispatch(&self, request: DispatchRequest) -> Result<(), WorkerError> {
        let should_hang = {
            let mut state = self.state.lock();
            state.dispatch_count += 1;
            if state.hang_dispatches > 0 {
                state.hang_dispatches -= 1;
                true
            } else {
                false
            }
        };
        if should_hang {
            std::future::pending::<()>().await;
            unreachable!("pending future resolved");
        }
        {
            let mut state = self.state.lock();
            if state.fail_dispatches > 0 {
                state.fail_dispatches -= 1;
                return Err(WorkerError::Unavailable("scripted dispatch failure".into()));
            }
        }

        let run_id = request.run_id;
        let mut state = self.state.lock();
        state.identities.insert(run_id, (request.task.id, request.agent.id));
        let script = state.scripts.get(&request.task.id).cloned().unwrap_or_default();
        let duplicate = state.duplicate_seqs;
        let tx = state
            .streams
            .get(&run_id)
            .cloned()
            .ok_or(WorkerError::StreamClosed(run_id))?;

        for payload in script {
            let seq = {
                let next = state.next_seq.entry(run_id).or_insert(1);
                let seq = *next;
                *next += 1;
                seq
            };
            let at_ms = 1_000 + seq;
            let event = AgentEvent::new(run_id, request.task.id, request.agent.id, at_ms, payload);
            let message = WorkerEvent { worker_seq: seq, event };
            if duplicate {
                let _ = tx.send(message.clone());
            }
            let _ = tx.send(message);
        }
        Ok(())
    }

    async fn cancel(&self, run_id: RunId) -> Result<(), WorkerError> {
        let mut state = self.state.lock();
        state.calls.push((run_id, "cancel"));
        if !state.emit_terminal_on_cancel {
            return Ok(());
        }
        let Some((task_id, agent_id)) = state.identities.get(&run_id).copied() else {
            return Ok(());
        };
        let seq = {
            let next = state.next_seq.entry(run_id).or_insert(1);
            let seq = *next;
            *next += 1;
            seq
        };
        let event = AgentEvent::new(
            run_id,
            task_id,
            agent_id,
            1_000 + seq,
            EventPayload::Terminal {
                status: TerminalStatus::Cancelled,
                reason: Some("cancelled by user".into()),
                output: None,
            },
        );
        if let Some(tx) = state.streams.get(&run_id) {
            let _ = tx.send(WorkerEvent { worker_seq: seq, event });
        }
        Ok(())
    }

    async fn pause(&self, run_id: RunId) -> Result<(), WorkerError> {
        self.state.lock().calls.push((run_id, "pause"));
        Ok(())
    }

    async fn resume(&self, run_id: RunId) -> Result<(), WorkerError> {
        self.state.lock().calls.push((run_id, "resume"));
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
