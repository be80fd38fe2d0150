// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request handlers: translate protocol requests into engine calls.
//!
//! Domain errors map 1:1 to their [`atc_core::ErrorKind`]; internal
//! faults are logged structurally and surfaced generically.

use atc_core::{Clock, ErrorKind};
use atc_engine::{
    ApprovalDecision, CostAggregator, EngineError, PlanSpec, Runtime, StartRequest, StepSpec,
};
use atc_policy::PolicyProfile;
use atc_storage::{AuditFilter, Cursor, TrajectoryFilter};
use atc_wire::{PlanDetail, Request, Response, RunDetail, SessionDetail, TrajectoryPageDto};
use std::sync::Arc;

/// Principal attached to IPC actions; the socket is mode-0600 local.
const LOCAL_ACTOR: &str = "local";

/// Dispatch one non-streaming request.
pub async fn handle<C: Clock>(runtime: &Arc<Runtime<C>>, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::RunStart {
            task_id,
            agent_id,
            policy_profile,
            mode,
            idempotency_key,
            context_pack,
        } => {
            let mut start = StartRequest::new(task_id, agent_id)
                .actor(LOCAL_ACTOR)
                .context_pack(context_pack);
            start.policy_profile = policy_profile;
            start.mode = mode;
            start.idempotency_key = idempotency_key;
            match runtime.start(start).await {
                Ok(run) => Response::Run { run: RunDetail::from(&run) },
                Err(err) => engine_error(err),
            }
        }

        Request::RunGet { run_id } => match runtime.registry().find_run(&run_id) {
            Some(run) => Response::Run { run: RunDetail::from(&run) },
            None => Response::error(ErrorKind::NotFound, format!("run {} not found", run_id)),
        },

        Request::RunCancel { run_id } => match runtime.cancel_run(run_id, LOCAL_ACTOR).await {
            Ok(run) => Response::Run { run: RunDetail::from(&run) },
            Err(err) => engine_error(err),
        },

        Request::RunApprove { run_id, call_id, decision } => {
            let decision = match decision.as_str() {
                "allow" => ApprovalDecision::Allow,
                "deny" => ApprovalDecision::Deny,
                other => {
                    return Response::error(
                        ErrorKind::Validation,
                        format!("decision must be allow|deny, got '{}'", other),
                    )
                }
            };
            let consumed = runtime.resolve_approval(run_id, &call_id, decision, LOCAL_ACTOR);
            Response::Approval { consumed }
        }

        Request::Trajectory { run_id, types, cursor, limit } => {
            let filter = TrajectoryFilter::types(types);
            let cursor = cursor.map(Cursor::from);
            let cap = runtime.config().trajectory_page_cap;
            let limit = limit.unwrap_or(100);
            match runtime.journal().load_trajectory(run_id, &filter, cursor.as_ref(), limit, cap) {
                Ok(page) => Response::Trajectory {
                    page: TrajectoryPageDto {
                        entries: page.entries,
                        cursor: page.cursor.map(|c| c.to_string()),
                        has_more: page.has_more,
                        total: page.total,
                    },
                },
                Err(err) => journal_error(err),
            }
        }

        Request::RunStats { run_id } => match runtime.journal().stats(run_id) {
            Ok(stats) => match serde_json::to_value(&stats) {
                Ok(stats) => Response::Stats { stats },
                Err(err) => {
                    tracing::error!(%err, "stats encoding failed");
                    Response::internal()
                }
            },
            Err(err) => journal_error(err),
        },

        Request::RunCheckpoints { run_id } => match runtime.journal().list_checkpoints(run_id) {
            Ok(events) => Response::Checkpoints { events },
            Err(err) => journal_error(err),
        },

        Request::ProjectCost { project_id } => {
            let aggregator = CostAggregator::new(
                Arc::clone(runtime.journal()),
                Arc::clone(runtime.registry()),
            );
            match aggregator.project_summary(project_id) {
                Ok(summary) => Response::Cost { summary },
                Err(err) => engine_error(err),
            }
        }

        Request::PlanCreate {
            project_id,
            name,
            protocol,
            max_parallel,
            max_rounds,
            failure_policy,
            steps,
        } => {
            let mut spec = PlanSpec::new(project_id, name, protocol)
                .max_parallel(max_parallel.unwrap_or(runtime.config().max_parallel))
                .failure_policy(failure_policy);
            spec.max_rounds = max_rounds;
            spec.actor = LOCAL_ACTOR.to_string();
            for step in steps {
                let mut step_spec = StepSpec::new(step.task_id, step.agent_id)
                    .depends_on(step.depends_on)
                    .deliver_mode(step.deliver_mode);
                step_spec.policy_profile = step.policy_profile;
                spec = spec.step(step_spec);
            }
            match runtime.create_plan(spec) {
                Ok(plan) => Response::Plan { plan: PlanDetail::from(&plan) },
                Err(err) => engine_error(err),
            }
        }

        Request::PlanStart { plan_id } => match runtime.start_plan(plan_id, LOCAL_ACTOR).await {
            Ok(plan) => Response::Plan { plan: PlanDetail::from(&plan) },
            Err(err) => engine_error(err),
        },

        Request::PlanCancel { plan_id } => match runtime.cancel_plan(plan_id, LOCAL_ACTOR).await {
            Ok(plan) => Response::Plan { plan: PlanDetail::from(&plan) },
            Err(err) => engine_error(err),
        },

        Request::PlanGet { plan_id } => match runtime.registry().get_plan(plan_id) {
            Some(plan) => Response::Plan { plan: PlanDetail::from(&plan) },
            None => Response::error(ErrorKind::NotFound, format!("plan {} not found", plan_id)),
        },

        Request::SessionResume { parent_run_id } => {
            match runtime.resume(parent_run_id, LOCAL_ACTOR).await {
                Ok(session) => Response::Session { session: SessionDetail::from(&session) },
                Err(err) => engine_error(err),
            }
        }

        Request::SessionFork { parent_run_id, event_cutoff_id } => {
            match runtime.fork(parent_run_id, event_cutoff_id, LOCAL_ACTOR) {
                Ok(session) => Response::Session { session: SessionDetail::from(&session) },
                Err(err) => engine_error(err),
            }
        }

        Request::SessionRewind { parent_run_id, event_cutoff_id } => {
            match runtime.rewind(parent_run_id, event_cutoff_id, LOCAL_ACTOR) {
                Ok(session) => Response::Session { session: SessionDetail::from(&session) },
                Err(err) => engine_error(err),
            }
        }

        Request::SessionReplay { parent_run_id, checkpoint_id } => {
            match runtime.replay(parent_run_id, checkpoint_id, LOCAL_ACTOR).await {
                Ok(session) => Response::Session { session: SessionDetail::from(&session) },
                Err(err) => engine_error(err),
            }
        }

        Request::PolicyGet { name } => match runtime.policies().get(&name) {
            Ok(compiled) => match serde_json::to_value(compiled.profile()) {
                Ok(profile) => Response::Policy { profile },
                Err(err) => {
                    tracing::error!(%err, "profile encoding failed");
                    Response::internal()
                }
            },
            Err(err) => engine_error(err.into()),
        },

        Request::PolicyPut { profile } => {
            let profile: PolicyProfile = match serde_json::from_value(profile) {
                Ok(profile) => profile,
                Err(err) => {
                    return Response::error(
                        ErrorKind::Validation,
                        format!("malformed profile: {}", err),
                    )
                }
            };
            match runtime.policies().put(&profile) {
                Ok(()) => Response::Ok,
                Err(err) => engine_error(err.into()),
            }
        }

        Request::PolicyDelete { name } => match runtime.policies().delete(&name) {
            Ok(existed) => Response::PolicyDeleted { existed },
            Err(err) => engine_error(err.into()),
        },

        Request::PolicyList => match runtime.policies().list() {
            Ok(names) => Response::PolicyList { names },
            Err(err) => engine_error(err.into()),
        },

        Request::AuditPage { run_id, actor, cursor, limit } => {
            let filter = AuditFilter { run_id, project_id: None, actor };
            let cursor = cursor.map(Cursor::from);
            let cap = runtime.config().trajectory_page_cap;
            match runtime.audit_log().page(&filter, cursor.as_ref(), limit.unwrap_or(100), cap) {
                Ok(page) => Response::Audit {
                    page: TrajectoryPageDto {
                        entries: page.entries,
                        cursor: page.cursor.map(|c| c.to_string()),
                        has_more: page.has_more,
                        total: page.total,
                    },
                },
                Err(err) => journal_error(err),
            }
        }

        // Streaming and shutdown are intercepted by the connection loop.
        Request::Subscribe { .. } | Request::Shutdown => {
            Response::error(ErrorKind::Validation, "request not valid in this context")
        }
    }
}

fn engine_error(err: EngineError) -> Response {
    let kind = err.kind();
    if kind == ErrorKind::Internal {
        tracing::error!(%err, "internal engine error");
        return Response::internal();
    }
    Response::error(kind, err.to_string())
}

fn journal_error(err: atc_storage::JournalError) -> Response {
    let kind = err.kind();
    if kind == ErrorKind::Internal {
        tracing::error!(%err, "internal journal error");
        return Response::internal();
    }
    Response::error(kind, err.to_string())
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
