// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for runtime tests: a real journal in a tempdir, a
//! scriptable fake worker, and a fake clock.

mod plan_flow;
mod reconciliation;
mod run_flow;
mod session_flow;

use crate::approval::ApprovalRegistry;
use crate::broker::Broker;
use crate::registry::Registry;
use crate::runtime::{Runtime, RuntimeDeps};
use atc_adapters::{FakeWorker, WorkerRegistry};
use atc_core::{
    Agent, Config, EventPayload, FakeClock, Project, Run, RunStatus, Task, TerminalStatus,
    ToolCall,
};
use atc_policy::ProfileStore;
use atc_storage::{AuditLog, EventJournal};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct Harness {
    pub runtime: Arc<Runtime<FakeClock>>,
    pub worker: FakeWorker,
    pub clock: FakeClock,
    pub project: Project,
    _dir: tempfile::TempDir,
}

pub(crate) fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let worker = FakeWorker::new();

    let mut workers = WorkerRegistry::new();
    workers.register(Arc::new(worker.clone()));

    let config = Config {
        state_dir: dir.path().join("state"),
        log_dir: dir.path().join("log"),
        worker_dispatch_timeout_ms: 200,
        dispatch_retry_cap: 1,
        approval_timeout_ms: 60_000,
        cancel_grace_ms: 100,
        stale_run_threshold_ms: 5_000,
        ..Config::default()
    };

    let deps = RuntimeDeps {
        journal: Arc::new(EventJournal::open(dir.path().join("journal")).unwrap()),
        audit: Arc::new(AuditLog::open(dir.path().join("audit.jsonl")).unwrap()),
        registry: Arc::new(Registry::new()),
        approvals: Arc::new(ApprovalRegistry::new()),
        broker: Arc::new(Broker::new(64)),
        policies: Arc::new(ProfileStore::open(dir.path().join("policies")).unwrap()),
        workers: Arc::new(workers),
    };
    let runtime = Runtime::new(deps, config, clock.clone());

    let project = Project::builder().build();
    runtime.create_project(project.clone());

    Harness { runtime, worker, clock, project, _dir: dir }
}

impl Harness {
    /// Register a task and an idle fake-backend agent in the project.
    pub fn seed_task_agent(&self, name: &str) -> (Task, Agent) {
        let task = Task::builder().project_id(self.project.id).title(name).build();
        let agent = Agent::builder()
            .project_id(self.project.id)
            .name(format!("{}-agent", name))
            .backend_kind("fake")
            .build();
        self.runtime.create_task(task.clone());
        self.runtime.create_agent(agent.clone());
        (task, agent)
    }

    pub fn run(&self, id: atc_core::RunId) -> Run {
        self.runtime.registry().get_run(id).unwrap()
    }

    /// Poll until the run reaches `status` (the run loop is async).
    pub async fn wait_for_status(&self, id: atc_core::RunId, status: RunStatus) {
        for _ in 0..300 {
            if self.run(id).status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("run {} never reached {} (is {})", id, status, self.run(id).status);
    }

    pub async fn wait_until(&self, mut condition: impl FnMut() -> bool, what: &str) {
        for _ in 0..300 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition never reached: {}", what);
    }
}

/// Script shorthand: successful `Read` then terminal success.
pub(crate) fn read_then_succeed() -> Vec<EventPayload> {
    vec![
        EventPayload::ToolCall { call: ToolCall::new("c1", "Read").path("main.go") },
        EventPayload::ToolResult {
            call_id: "c1".into(),
            ok: true,
            blocked: false,
            reason: None,
            output: Some("package main".into()),
        },
        EventPayload::Terminal {
            status: TerminalStatus::Succeeded,
            reason: None,
            output: Some("done".into()),
        },
    ]
}

pub(crate) fn terminal(status: TerminalStatus) -> EventPayload {
    EventPayload::Terminal { status, reason: None, output: None }
}
