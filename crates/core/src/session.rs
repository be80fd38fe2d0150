// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sessions: derived run heads created by resume, fork, or rewind.

use crate::event::EventId;
use crate::run::RunId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a derived-run session.
    pub struct SessionId("ses-");
}

/// How the derived run relates to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Continue from the parent's last checkpoint.
    Resume,
    /// Independent copy of a parent prefix; parent unaffected.
    Fork,
    /// Logical truncation via prefix copy; parent preserved.
    Rewind,
    /// Deterministic re-execution from a checkpoint.
    Replay,
}

crate::simple_display! {
    SessionKind {
        Resume => "resume",
        Fork => "fork",
        Rewind => "rewind",
        Replay => "replay",
    }
}

/// Status of a session head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Dispatched,
    Failed,
}

crate::simple_display! {
    SessionStatus {
        Created => "created",
        Dispatched => "dispatched",
        Failed => "failed",
    }
}

/// A derived run head.
///
/// The new run inherits its parent's events up to `event_cutoff_id`
/// (inclusive) and appends new events with strictly increasing seq.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub parent_run_id: RunId,
    pub kind: SessionKind,
    pub event_cutoff_id: EventId,
    /// Seq of the cutoff event, denormalized for prefix copies.
    pub event_cutoff_seq: u64,
    pub new_run_id: RunId,
    pub status: SessionStatus,
    pub created_at_ms: u64,
}

impl Session {
    pub fn new(
        parent_run_id: RunId,
        kind: SessionKind,
        event_cutoff_id: EventId,
        event_cutoff_seq: u64,
        new_run_id: RunId,
        epoch_ms: u64,
    ) -> Self {
        Self {
            id: SessionId::new(),
            parent_run_id,
            kind,
            event_cutoff_id,
            event_cutoff_seq,
            new_run_id,
            status: SessionStatus::Created,
            created_at_ms: epoch_ms,
        }
    }
}
