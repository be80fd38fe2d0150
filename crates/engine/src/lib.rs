// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! atc-engine: the orchestration and runtime kernel.
//!
//! Owns run state machines, the plan DAG walker, approval suspension,
//! live event fan-out, cost accounting, and derived-run sessions. The
//! journal is the durable truth; everything in this crate can be
//! rebuilt from it on restart.

mod activity;
mod approval;
mod broker;
mod cost;
mod error;
mod registry;
mod runtime;

pub use activity::ActivityLog;
pub use approval::{ApprovalDecision, ApprovalOutcome, ApprovalRegistry};
pub use broker::{Broker, StreamItem, Subscription, Topic};
pub use cost::CostAggregator;
pub use error::EngineError;
pub use registry::{Registry, RegistrySnapshot};
pub use runtime::{
    PlanSpec, RecoveryReport, Runtime, RuntimeDeps, StartRequest, StepSpec,
};
