// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run activity log: one human-readable line per accepted event,
//! alongside (never instead of) the journal.

use atc_core::RunId;
use parking_lot::Mutex;
use std::io::Write;
use std::path::PathBuf;

/// Appends plain-text activity lines to `<dir>/<run_id>.log`.
///
/// Failures are logged and swallowed: activity logs are a convenience
/// for humans, not state.
pub struct ActivityLog {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl ActivityLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), lock: Mutex::new(()) }
    }

    pub fn append(&self, run_id: RunId, at_ms: u64, line: &str) {
        let _guard = self.lock.lock();
        if let Err(err) = self.write_line(run_id, at_ms, line) {
            tracing::debug!(run = %run_id, %err, "activity log write failed");
        }
    }

    fn write_line(&self, run_id: RunId, at_ms: u64, line: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.log", run_id));
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "[{}] {}", at_ms, line)
    }

    /// Full contents of a run's activity log, if any.
    pub fn read(&self, run_id: RunId) -> Option<String> {
        std::fs::read_to_string(self.dir.join(format!("{}.log", run_id))).ok()
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
