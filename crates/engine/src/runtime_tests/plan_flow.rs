// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runtime::{PlanSpec, StepSpec};
use atc_core::{
    EventPayload, FailurePolicy, PlanStatus, Protocol, StepStatus, SubstepSpec, TerminalStatus,
};

#[tokio::test]
async fn sequential_single_step_succeeds() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("t1");
    h.worker.script_task(task.id, read_then_succeed());

    let plan = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "seq", Protocol::Sequential)
                .step(StepSpec::new(task.id, agent.id).policy_profile("full-access")),
        )
        .unwrap();
    h.runtime.start_plan(plan.id, "alice").await.unwrap();

    h.wait_until(
        || h.runtime.registry().get_plan(plan.id).unwrap().status == PlanStatus::Succeeded,
        "plan succeeded",
    )
    .await;
    let done = h.runtime.registry().get_plan(plan.id).unwrap();
    assert_eq!(done.steps[0].status, StepStatus::Succeeded);
    let run_id = done.steps[0].run_id.unwrap();
    assert_eq!(h.run(run_id).status, RunStatus::Succeeded);
    assert_eq!(h.runtime.journal().load_by_run(run_id).unwrap().len(), 3);
}

#[tokio::test]
async fn sequential_steps_run_in_declared_order() {
    let h = harness();
    let (task_a, agent_a) = h.seed_task_agent("a");
    let (task_b, agent_b) = h.seed_task_agent("b");
    h.worker.script_task(task_a.id, read_then_succeed());
    h.worker.script_task(task_b.id, read_then_succeed());

    let plan = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "seq", Protocol::Sequential)
                .step(StepSpec::new(task_a.id, agent_a.id).policy_profile("full-access"))
                .step(StepSpec::new(task_b.id, agent_b.id).policy_profile("full-access")),
        )
        .unwrap();
    h.runtime.start_plan(plan.id, "alice").await.unwrap();

    h.wait_until(
        || h.runtime.registry().get_plan(plan.id).unwrap().status == PlanStatus::Succeeded,
        "plan succeeded",
    )
    .await;
    let done = h.runtime.registry().get_plan(plan.id).unwrap();
    let run_a = h.run(done.steps[0].run_id.unwrap());
    let run_b = h.run(done.steps[1].run_id.unwrap());
    // Step B only started after step A's run ended.
    assert!(run_b.started_at_ms >= run_a.started_at_ms);
}

#[tokio::test]
async fn parallel_plan_isolates_one_failure() {
    let h = harness();
    let (task_a, agent_a) = h.seed_task_agent("a");
    let (task_b, agent_b) = h.seed_task_agent("b");
    let (task_c, agent_c) = h.seed_task_agent("c");
    h.worker.script_task(task_a.id, read_then_succeed());
    h.worker.script_task(
        task_b.id,
        vec![EventPayload::Terminal {
            status: TerminalStatus::Failed,
            reason: Some("build broke".into()),
            output: None,
        }],
    );
    h.worker.script_task(task_c.id, read_then_succeed());

    let plan = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "par", Protocol::Parallel)
                .max_parallel(3)
                .step(StepSpec::new(task_a.id, agent_a.id).policy_profile("full-access"))
                .step(StepSpec::new(task_b.id, agent_b.id).policy_profile("full-access"))
                .step(StepSpec::new(task_c.id, agent_c.id).policy_profile("full-access")),
        )
        .unwrap();
    h.runtime.start_plan(plan.id, "alice").await.unwrap();

    h.wait_until(
        || h.runtime.registry().get_plan(plan.id).unwrap().is_terminal(),
        "plan terminal",
    )
    .await;
    let done = h.runtime.registry().get_plan(plan.id).unwrap();
    assert_eq!(done.status, PlanStatus::Failed);
    assert_eq!(done.steps[0].status, StepStatus::Succeeded);
    assert_eq!(done.steps[1].status, StepStatus::Failed);
    assert_eq!(done.steps[2].status, StepStatus::Succeeded);
}

#[tokio::test]
async fn lenient_failure_skips_transitive_dependents() {
    let h = harness();
    let (task_a, agent_a) = h.seed_task_agent("a");
    let (task_b, agent_b) = h.seed_task_agent("b");
    let (task_c, agent_c) = h.seed_task_agent("c");
    h.worker.script_task(task_a.id, vec![terminal(TerminalStatus::Failed)]);
    h.worker.script_task(task_b.id, read_then_succeed());
    h.worker.script_task(task_c.id, read_then_succeed());

    // a <- b <- c, a fails: b and c are skipped.
    let plan = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "deps", Protocol::Parallel)
                .max_parallel(3)
                .failure_policy(FailurePolicy::Lenient)
                .step(StepSpec::new(task_a.id, agent_a.id).policy_profile("full-access"))
                .step(
                    StepSpec::new(task_b.id, agent_b.id)
                        .policy_profile("full-access")
                        .depends_on(vec![0]),
                )
                .step(
                    StepSpec::new(task_c.id, agent_c.id)
                        .policy_profile("full-access")
                        .depends_on(vec![1]),
                ),
        )
        .unwrap();
    h.runtime.start_plan(plan.id, "alice").await.unwrap();

    h.wait_until(
        || h.runtime.registry().get_plan(plan.id).unwrap().is_terminal(),
        "plan terminal",
    )
    .await;
    let done = h.runtime.registry().get_plan(plan.id).unwrap();
    assert_eq!(done.status, PlanStatus::Failed);
    assert_eq!(done.steps[1].status, StepStatus::Skipped);
    assert_eq!(done.steps[2].status, StepStatus::Skipped);
    // Skipped steps never got runs.
    assert!(done.steps[1].run_id.is_none());
}

#[tokio::test]
async fn strict_failure_cancels_untouched_steps() {
    let h = harness();
    let (task_a, agent_a) = h.seed_task_agent("a");
    let (task_b, agent_b) = h.seed_task_agent("b");
    h.worker.script_task(task_a.id, vec![terminal(TerminalStatus::Failed)]);
    h.worker.script_task(task_b.id, read_then_succeed());

    let plan = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "strict", Protocol::Sequential)
                .failure_policy(FailurePolicy::Strict)
                .step(StepSpec::new(task_a.id, agent_a.id).policy_profile("full-access"))
                .step(StepSpec::new(task_b.id, agent_b.id).policy_profile("full-access")),
        )
        .unwrap();
    h.runtime.start_plan(plan.id, "alice").await.unwrap();

    h.wait_until(
        || h.runtime.registry().get_plan(plan.id).unwrap().is_terminal(),
        "plan terminal",
    )
    .await;
    let done = h.runtime.registry().get_plan(plan.id).unwrap();
    assert_eq!(done.status, PlanStatus::Failed);
    assert_eq!(done.steps[1].status, StepStatus::Cancelled);
}

#[tokio::test]
async fn ping_pong_reaches_max_rounds() {
    let h = harness();
    let (coder_task, coder) = h.seed_task_agent("coder");
    let (reviewer_task, reviewer) = h.seed_task_agent("reviewer");
    // Neither side ever accepts.
    h.worker.script_task(
        coder_task.id,
        vec![
            EventPayload::Message { text: "patch v1".into(), accepted: false, substeps: vec![] },
            terminal(TerminalStatus::Succeeded),
        ],
    );
    h.worker.script_task(
        reviewer_task.id,
        vec![
            EventPayload::Message { text: "needs work".into(), accepted: false, substeps: vec![] },
            terminal(TerminalStatus::Succeeded),
        ],
    );

    let plan = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "pp", Protocol::PingPong)
                .max_rounds(2u32)
                .step(StepSpec::new(coder_task.id, coder.id).policy_profile("full-access"))
                .step(StepSpec::new(reviewer_task.id, reviewer.id).policy_profile("full-access")),
        )
        .unwrap();
    h.runtime.start_plan(plan.id, "alice").await.unwrap();

    h.wait_until(
        || h.runtime.registry().get_plan(plan.id).unwrap().is_terminal(),
        "plan terminal",
    )
    .await;
    let done = h.runtime.registry().get_plan(plan.id).unwrap();
    assert_eq!(done.status, PlanStatus::Failed);
    assert_eq!(done.error.as_deref(), Some("max_rounds_reached"));
    assert_eq!(done.steps[0].round, 2);
    assert_eq!(done.steps[1].round, 2);
    // Exactly four runs were created: coder, reviewer, coder, reviewer.
    let runs = h.runtime.registry().read(|s| s.runs.len());
    assert_eq!(runs, 4);
}

#[tokio::test]
async fn ping_pong_acceptance_succeeds() {
    let h = harness();
    let (coder_task, coder) = h.seed_task_agent("coder");
    let (reviewer_task, reviewer) = h.seed_task_agent("reviewer");
    h.worker.script_task(
        coder_task.id,
        vec![
            EventPayload::Message { text: "patch v1".into(), accepted: false, substeps: vec![] },
            terminal(TerminalStatus::Succeeded),
        ],
    );
    h.worker.script_task(
        reviewer_task.id,
        vec![
            EventPayload::Message { text: "ship it".into(), accepted: true, substeps: vec![] },
            terminal(TerminalStatus::Succeeded),
        ],
    );

    let plan = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "pp", Protocol::PingPong)
                .max_rounds(4u32)
                .step(StepSpec::new(coder_task.id, coder.id).policy_profile("full-access"))
                .step(StepSpec::new(reviewer_task.id, reviewer.id).policy_profile("full-access")),
        )
        .unwrap();
    h.runtime.start_plan(plan.id, "alice").await.unwrap();

    h.wait_until(
        || h.runtime.registry().get_plan(plan.id).unwrap().is_terminal(),
        "plan terminal",
    )
    .await;
    let done = h.runtime.registry().get_plan(plan.id).unwrap();
    assert_eq!(done.status, PlanStatus::Succeeded);
    assert_eq!(h.runtime.registry().read(|s| s.runs.len()), 2);
}

#[tokio::test]
async fn hierarchical_coordinator_spawns_children() {
    let h = harness();
    let (coordinator_task, coordinator) = h.seed_task_agent("lead");
    let (sub_a_task, sub_a) = h.seed_task_agent("sub-a");
    let (sub_b_task, sub_b) = h.seed_task_agent("sub-b");
    h.worker.script_task(
        coordinator_task.id,
        vec![
            EventPayload::Message {
                text: "splitting work".into(),
                accepted: false,
                substeps: vec![
                    SubstepSpec {
                        task_id: sub_a_task.id,
                        agent_id: sub_a.id,
                        policy_profile: Some("full-access".into()),
                        depends_on: vec![],
                    },
                    SubstepSpec {
                        task_id: sub_b_task.id,
                        agent_id: sub_b.id,
                        policy_profile: Some("full-access".into()),
                        depends_on: vec![0],
                    },
                ],
            },
            terminal(TerminalStatus::Succeeded),
        ],
    );
    h.worker.script_task(sub_a_task.id, read_then_succeed());
    h.worker.script_task(sub_b_task.id, read_then_succeed());

    let plan = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "tree", Protocol::Hierarchical)
                .max_parallel(2)
                .step(StepSpec::new(coordinator_task.id, coordinator.id).policy_profile("full-access")),
        )
        .unwrap();
    h.runtime.start_plan(plan.id, "alice").await.unwrap();

    h.wait_until(
        || h.runtime.registry().get_plan(plan.id).unwrap().is_terminal(),
        "plan terminal",
    )
    .await;
    let done = h.runtime.registry().get_plan(plan.id).unwrap();
    assert_eq!(done.status, PlanStatus::Succeeded);
    assert_eq!(done.steps.len(), 3);
    assert!(done.steps.iter().all(|s| s.status == StepStatus::Succeeded));
    // The second child declared a dependency on the first.
    assert_eq!(done.steps[2].depends_on, vec![done.steps[1].id]);
}

#[tokio::test]
async fn plan_cancel_cancels_running_and_pending_steps() {
    let h = harness();
    let (task_a, agent_a) = h.seed_task_agent("a");
    let (task_b, agent_b) = h.seed_task_agent("b");
    // Step A never terminates on its own.
    h.worker.script_task(task_a.id, vec![EventPayload::Thought { text: "working".into() }]);
    h.worker.script_task(task_b.id, read_then_succeed());

    let plan = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "cxl", Protocol::Sequential)
                .step(StepSpec::new(task_a.id, agent_a.id).policy_profile("full-access"))
                .step(StepSpec::new(task_b.id, agent_b.id).policy_profile("full-access")),
        )
        .unwrap();
    h.runtime.start_plan(plan.id, "alice").await.unwrap();
    h.wait_until(
        || {
            h.runtime
                .registry()
                .get_plan(plan.id)
                .unwrap()
                .steps[0]
                .run_id
                .map(|r| h.runtime.journal().last_seq(r) >= 1)
                .unwrap_or(false)
        },
        "step A running",
    )
    .await;

    h.runtime.cancel_plan(plan.id, "alice").await.unwrap();
    let cancelled = h.runtime.registry().get_plan(plan.id).unwrap();
    assert_eq!(cancelled.status, PlanStatus::Cancelled);
    assert_eq!(cancelled.steps[1].status, StepStatus::Cancelled);

    let run_a = cancelled.steps[0].run_id.unwrap();
    h.wait_for_status(run_a, RunStatus::Cancelled).await;
}

#[tokio::test]
async fn create_plan_rejects_cycles() {
    let h = harness();
    let (task_a, agent_a) = h.seed_task_agent("a");
    let (task_b, agent_b) = h.seed_task_agent("b");

    let err = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "cycle", Protocol::Parallel)
                .step(StepSpec::new(task_a.id, agent_a.id).depends_on(vec![1]))
                .step(StepSpec::new(task_b.id, agent_b.id).depends_on(vec![0])),
        )
        .unwrap_err();
    assert_eq!(err.kind(), atc_core::ErrorKind::Validation);
}

#[tokio::test]
async fn create_plan_rejects_foreign_references() {
    let h = harness();
    let (task, _) = h.seed_task_agent("a");
    let foreign = atc_core::Agent::builder().backend_kind("fake").build();
    h.runtime.create_agent(foreign.clone());

    let err = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "foreign", Protocol::Sequential)
                .step(StepSpec::new(task.id, foreign.id)),
        )
        .unwrap_err();
    assert_eq!(err.kind(), atc_core::ErrorKind::Validation);
}

#[tokio::test]
async fn start_plan_twice_conflicts() {
    let h = harness();
    let (task, agent) = h.seed_task_agent("a");
    h.worker.script_task(task.id, read_then_succeed());
    let plan = h
        .runtime
        .create_plan(
            PlanSpec::new(h.project.id, "dup", Protocol::Sequential)
                .step(StepSpec::new(task.id, agent.id).policy_profile("full-access")),
        )
        .unwrap();
    h.runtime.start_plan(plan.id, "alice").await.unwrap();
    let err = h.runtime.start_plan(plan.id, "alice").await.unwrap_err();
    assert_eq!(err.kind(), atc_core::ErrorKind::Conflict);
}
