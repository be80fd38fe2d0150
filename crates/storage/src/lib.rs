// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! atc-storage: durable append-only journals and snapshots.
//!
//! The event journal is the only mutable shared durable state in the
//! system; every in-memory index must be reconstructible from it.

mod audit;
mod cursor;
mod journal;
mod snapshot;

pub use audit::{AuditFilter, AuditLog};
pub use cursor::{Cursor, TrajectoryFilter, TrajectoryPage};
pub use journal::{EventJournal, JournalError, JournalStats};
pub use snapshot::{load_snapshot, save_snapshot, SnapshotError};
