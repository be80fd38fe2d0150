// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for control-plane communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod response;
mod subjects;
mod types;
mod wire;

pub use request::{PlanStepRequest, Request};
pub use response::Response;
pub use subjects::{cancel_subject, dispatch_subject, events_subject, WorkerMessage};
pub use types::{
    PlanDetail, RunDetail, SessionDetail, StepDetail, TrajectoryPageDto,
};
pub use wire::{decode, encode, read_message, write_message, ProtocolError, MAX_FRAME_SIZE};

#[cfg(test)]
mod property_tests;
