// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fake::FakeWorker;
use crate::worker::{DispatchRequest, WorkerAdapter};
use atc_core::{Agent, AgentStatus, ContextPack, ProjectId, RunId, Task};

fn request(run_id: RunId, worker: &FakeWorker) -> DispatchRequest {
    let project_id = ProjectId::new();
    let task = Task::new(project_id, "t", "prompt", 1_000);
    let mut agent = Agent::new(project_id, "a", "fake");
    agent.status = AgentStatus::Idle;
    // The stream must exist before dispatch so no event is lost.
    let _rx = worker.subscribe(run_id);
    DispatchRequest {
        run_id,
        task,
        agent,
        mode: None,
        policy_profile: "full-access".into(),
        context_pack: ContextPack::default(),
    }
}

fn config() -> BusConfig {
    BusConfig {
        ack_timeout: std::time::Duration::from_millis(100),
        retry_cap: 2,
        backoff_base: std::time::Duration::from_millis(10),
    }
}

#[tokio::test(start_paused = true)]
async fn dispatch_succeeds_first_try() {
    let worker = FakeWorker::new();
    let bus = DispatchBus::new(std::sync::Arc::new(worker.clone()), config());
    bus.dispatch(request(RunId::new(), &worker)).await.unwrap();
    assert_eq!(worker.dispatch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn dispatch_retries_transient_failures() {
    let worker = FakeWorker::new();
    worker.fail_dispatches(2);
    let bus = DispatchBus::new(std::sync::Arc::new(worker.clone()), config());
    bus.dispatch(request(RunId::new(), &worker)).await.unwrap();
    assert_eq!(worker.dispatch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn dispatch_exhausts_retry_cap() {
    let worker = FakeWorker::new();
    worker.fail_dispatches(10);
    let bus = DispatchBus::new(std::sync::Arc::new(worker.clone()), config());
    let err = bus.dispatch(request(RunId::new(), &worker)).await.unwrap_err();
    assert!(matches!(err, WorkerError::AckTimeout));
    // retry_cap = 2 means 3 attempts total.
    assert_eq!(worker.dispatch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn dispatch_times_out_unacknowledged_attempts() {
    let worker = FakeWorker::new();
    worker.hang_dispatches(10);
    let bus = DispatchBus::new(std::sync::Arc::new(worker.clone()), config());
    let err = bus.dispatch(request(RunId::new(), &worker)).await.unwrap_err();
    assert!(matches!(err, WorkerError::AckTimeout));
}

#[tokio::test(start_paused = true)]
async fn cancel_swallows_transport_errors() {
    let worker = FakeWorker::new();
    let bus = DispatchBus::new(std::sync::Arc::new(worker.clone()), config());
    // Cancelling a run the worker never saw is a no-op, not an error.
    bus.cancel(RunId::new()).await;
    assert_eq!(worker.calls().len(), 1);
}
