// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cursor pagination for trajectory and audit reads.
//!
//! A cursor encodes `(seq, id)` of the last entry of the previous page so
//! continuation stays stable under concurrent appends.

use atc_core::{AgentEvent, EventKind};
use serde::{Deserialize, Serialize};

/// Opaque continuation token: `"{seq}:{id}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl Cursor {
    pub fn encode(seq: u64, id: &str) -> Self {
        Self(format!("{}:{}", seq, id))
    }

    /// Decode into `(seq, id)`. Malformed cursors decode to `None`;
    /// callers treat that as a validation error.
    pub fn decode(&self) -> Option<(u64, &str)> {
        let (seq, id) = self.0.split_once(':')?;
        let seq = seq.parse().ok()?;
        Some((seq, id))
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Cursor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Server-side filter applied before pagination, so `limit` is a real
/// page size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryFilter {
    /// Restrict to these event kinds; empty means all kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<EventKind>,
    /// Only events with seq strictly greater than this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since_seq: Option<u64>,
    /// Only checkpoint-flagged events.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub checkpoints_only: bool,
}

impl TrajectoryFilter {
    pub fn types(types: Vec<EventKind>) -> Self {
        Self { types, ..Self::default() }
    }

    pub fn matches(&self, event: &AgentEvent) -> bool {
        if self.checkpoints_only && !event.checkpoint {
            return false;
        }
        if let Some(since) = self.since_seq {
            if event.seq <= since {
                return false;
            }
        }
        if !self.types.is_empty() {
            match event.kind() {
                Some(kind) if self.types.contains(&kind) => {}
                _ => return false,
            }
        }
        true
    }
}

/// One page of a paginated read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPage<T> {
    pub entries: Vec<T>,
    /// Continuation token; `None` on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
    /// True iff at least one matching entry past this page existed at
    /// query time.
    pub has_more: bool,
    /// Total matching entries at query time.
    pub total: usize,
}

impl<T> TrajectoryPage<T> {
    pub fn empty() -> Self {
        Self { entries: Vec::new(), cursor: None, has_more: false, total: 0 }
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
