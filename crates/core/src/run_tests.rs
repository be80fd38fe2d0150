// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn queued_run() -> Run {
    Run::builder().build()
}

#[yare::parameterized(
    queued_to_running         = { RunStatus::Queued, RunStatus::Running },
    queued_to_cancelling      = { RunStatus::Queued, RunStatus::Cancelling },
    queued_to_failed          = { RunStatus::Queued, RunStatus::Failed },
    running_to_awaiting       = { RunStatus::Running, RunStatus::AwaitingApproval },
    running_to_succeeded      = { RunStatus::Running, RunStatus::Succeeded },
    running_to_failed         = { RunStatus::Running, RunStatus::Failed },
    running_to_cancelling     = { RunStatus::Running, RunStatus::Cancelling },
    awaiting_to_running       = { RunStatus::AwaitingApproval, RunStatus::Running },
    awaiting_to_failed        = { RunStatus::AwaitingApproval, RunStatus::Failed },
    awaiting_to_cancelling    = { RunStatus::AwaitingApproval, RunStatus::Cancelling },
    cancelling_to_cancelled   = { RunStatus::Cancelling, RunStatus::Cancelled },
    cancelling_to_succeeded   = { RunStatus::Cancelling, RunStatus::Succeeded },
)]
fn legal_transitions(from: RunStatus, to: RunStatus) {
    assert!(from.can_transition(to), "{from} -> {to} should be legal");
}

#[yare::parameterized(
    queued_to_awaiting     = { RunStatus::Queued, RunStatus::AwaitingApproval },
    running_to_queued      = { RunStatus::Running, RunStatus::Queued },
    succeeded_to_running   = { RunStatus::Succeeded, RunStatus::Running },
    failed_to_cancelled    = { RunStatus::Failed, RunStatus::Cancelled },
    cancelled_to_running   = { RunStatus::Cancelled, RunStatus::Running },
    cancelling_to_running  = { RunStatus::Cancelling, RunStatus::Running },
)]
fn illegal_transitions(from: RunStatus, to: RunStatus) {
    assert!(!from.can_transition(to), "{from} -> {to} should be illegal");
}

#[yare::parameterized(
    succeeded = { RunStatus::Succeeded },
    failed    = { RunStatus::Failed },
    cancelled = { RunStatus::Cancelled },
)]
fn terminal_states_are_absorbing(terminal: RunStatus) {
    assert!(terminal.is_terminal());
    for next in [
        RunStatus::Queued,
        RunStatus::Running,
        RunStatus::AwaitingApproval,
        RunStatus::Cancelling,
        RunStatus::Succeeded,
        RunStatus::Failed,
        RunStatus::Cancelled,
    ] {
        assert!(!terminal.can_transition(next));
    }
}

#[test]
fn transition_same_status_is_idempotent() {
    let mut run = queued_run();
    run.transition(RunStatus::Queued).unwrap();
    assert_eq!(run.status, RunStatus::Queued);
}

#[test]
fn transition_rejects_illegal() {
    let mut run = queued_run();
    let err = run.transition(RunStatus::AwaitingApproval).unwrap_err();
    assert_eq!(err.from, RunStatus::Queued);
    assert_eq!(err.to, RunStatus::AwaitingApproval);
    assert_eq!(run.status, RunStatus::Queued);
}

#[test]
fn finalize_records_end_time_once() {
    let mut run = queued_run();
    run.transition(RunStatus::Running).unwrap();
    run.finalize(TerminalStatus::Failed, Some("boom".into()), None, 2_000).unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.ended_at_ms, Some(2_000));
    assert_eq!(run.error.as_deref(), Some("boom"));

    // A second finalize with the same terminal status does not rewrite.
    run.finalize(TerminalStatus::Failed, Some("other".into()), None, 3_000).unwrap();
    assert_eq!(run.ended_at_ms, Some(2_000));
    assert_eq!(run.error.as_deref(), Some("boom"));
}

#[test]
fn finalize_rejects_cross_terminal_moves() {
    let mut run = queued_run();
    run.transition(RunStatus::Running).unwrap();
    run.finalize(TerminalStatus::Succeeded, None, Some("done".into()), 2_000).unwrap();
    assert!(run.finalize(TerminalStatus::Failed, None, None, 3_000).is_err());
    assert_eq!(run.status, RunStatus::Succeeded);
}

#[test]
fn run_serde_roundtrip() {
    let run = Run::builder()
        .policy_profile("auto-edit")
        .model("sonnet")
        .idempotency_key("key-1")
        .build();
    let json = serde_json::to_string(&run).unwrap();
    let parsed: Run = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.id, run.id);
    assert_eq!(parsed.policy_profile, "auto-edit");
    assert_eq!(parsed.idempotency_key.as_deref(), Some("key-1"));
}

#[test]
fn terminal_status_maps_to_run_status() {
    assert_eq!(RunStatus::from(TerminalStatus::Succeeded), RunStatus::Succeeded);
    assert_eq!(RunStatus::from(TerminalStatus::Failed), RunStatus::Failed);
    assert_eq!(RunStatus::from(TerminalStatus::Cancelled), RunStatus::Cancelled);
}

#[test]
fn new_run_starts_queued() {
    let config = RunConfig::new(TaskId::new(), AgentId::new(), ProjectId::new())
        .policy_profile("full-access")
        .idempotency_key("k");
    let run = Run::new(RunId::new(), config, 5_000);
    assert_eq!(run.status, RunStatus::Queued);
    assert_eq!(run.started_at_ms, 5_000);
    assert_eq!(run.worker_high_seq, 0);
    assert!(!run.is_terminal());
}
