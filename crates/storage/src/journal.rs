// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-run event journal.
//!
//! One JSONL file per run under `<dir>/<run_id>.jsonl`. Appends are
//! serialised by a per-run lock that assigns a gap-free `seq`, enforces
//! the terminal guard, and flushes durably before returning. Reads open
//! the file independently and never block writers.

use crate::cursor::{Cursor, TrajectoryFilter, TrajectoryPage};
use atc_core::{AgentEvent, EventKind, RunId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Journal failures, each mapping to one [`atc_core::ErrorKind`].
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("run {0} has no journal")]
    UnknownRun(RunId),
    #[error("run {0} is terminal; append rejected")]
    Terminal(RunId),
    #[error("run {0} already has events; prefix copy rejected")]
    NotEmpty(RunId),
    #[error("duplicate worker_seq {worker_seq} for run {run_id}")]
    DuplicateWorkerSeq { run_id: RunId, worker_seq: u64 },
    #[error("malformed cursor '{0}'")]
    BadCursor(String),
    #[error("journal io: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl JournalError {
    pub fn kind(&self) -> atc_core::ErrorKind {
        match self {
            JournalError::UnknownRun(_) => atc_core::ErrorKind::NotFound,
            JournalError::Terminal(_)
            | JournalError::NotEmpty(_)
            | JournalError::DuplicateWorkerSeq { .. } => atc_core::ErrorKind::Conflict,
            JournalError::BadCursor(_) => atc_core::ErrorKind::Validation,
            JournalError::Io(_) | JournalError::Encoding(_) => atc_core::ErrorKind::Internal,
        }
    }
}

/// Per-run appender state, guarded by its own lock.
struct RunLog {
    last_seq: u64,
    last_at_ms: u64,
    terminal: bool,
    file: File,
}

/// Summary folded from one run's events.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JournalStats {
    pub count: usize,
    pub by_kind: HashMap<EventKind, usize>,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
    /// Wall-clock span between first and last event.
    pub span_ms: u64,
}

/// Append-only per-run event log.
pub struct EventJournal {
    dir: PathBuf,
    runs: Mutex<HashMap<RunId, Arc<Mutex<RunLog>>>>,
}

impl EventJournal {
    /// Open (or create) a journal directory and rebuild per-run counters
    /// from the files found there.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let journal = Self { dir, runs: Mutex::new(HashMap::new()) };
        for run_id in journal.scan_run_ids()? {
            journal.attach(run_id)?;
        }
        Ok(journal)
    }

    fn path_for(&self, run_id: RunId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", run_id))
    }

    fn scan_run_ids(&self) -> Result<Vec<RunId>, JournalError> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)?.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".jsonl") {
                ids.push(RunId::from_string(stem));
            }
        }
        Ok(ids)
    }

    /// All runs known to the journal.
    pub fn run_ids(&self) -> Vec<RunId> {
        self.runs.lock().keys().copied().collect()
    }

    pub fn contains(&self, run_id: RunId) -> bool {
        self.runs.lock().contains_key(&run_id)
    }

    /// Load or create the per-run appender entry.
    ///
    /// The map lock is held across creation so concurrent attaches can
    /// never produce two appenders (and two seq counters) for one run.
    fn attach(&self, run_id: RunId) -> Result<Arc<Mutex<RunLog>>, JournalError> {
        let mut runs = self.runs.lock();
        if let Some(entry) = runs.get(&run_id) {
            return Ok(Arc::clone(entry));
        }
        let path = self.path_for(run_id);
        let (last_seq, last_at_ms, terminal) = if path.exists() {
            let events = read_events(&path)?;
            let last_seq = events.last().map(|e| e.seq).unwrap_or(0);
            let last_at_ms = events.last().map(|e| e.at_ms).unwrap_or(0);
            let terminal = events.iter().any(|e| e.is_terminal());
            (last_seq, last_at_ms, terminal)
        } else {
            (0, 0, false)
        };
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let entry = Arc::new(Mutex::new(RunLog { last_seq, last_at_ms, terminal, file }));
        runs.insert(run_id, Arc::clone(&entry));
        Ok(entry)
    }

    /// Append one event, assigning `seq = last + 1` under the per-run lock.
    ///
    /// Fails with a conflict once a terminal event is recorded. Timestamps
    /// are clamped to stay monotonic per run. The line is flushed and
    /// synced before the counters advance, so a failed write leaves the
    /// journal unchanged.
    pub fn append(&self, mut event: AgentEvent) -> Result<AgentEvent, JournalError> {
        let entry = self.attach(event.run_id)?;
        let mut log = entry.lock();
        if log.terminal {
            return Err(JournalError::Terminal(event.run_id));
        }
        event.seq = log.last_seq + 1;
        if event.at_ms < log.last_at_ms {
            event.at_ms = log.last_at_ms;
        }
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        log.file.write_all(line.as_bytes())?;
        log.file.flush()?;
        log.file.sync_data()?;

        log.last_seq = event.seq;
        log.last_at_ms = event.at_ms;
        if event.is_terminal() {
            log.terminal = true;
        }
        tracing::trace!(run = %event.run_id, seq = event.seq, kind = ?event.kind(), "event appended");
        Ok(event)
    }

    /// Whether the run has recorded a terminal event.
    pub fn is_terminal(&self, run_id: RunId) -> bool {
        self.runs
            .lock()
            .get(&run_id)
            .map(|entry| entry.lock().terminal)
            .unwrap_or(false)
    }

    /// Highest assigned seq for the run (0 when empty or unknown).
    pub fn last_seq(&self, run_id: RunId) -> u64 {
        self.runs
            .lock()
            .get(&run_id)
            .map(|entry| entry.lock().last_seq)
            .unwrap_or(0)
    }

    /// Full ordered history of a run.
    pub fn load_by_run(&self, run_id: RunId) -> Result<Vec<AgentEvent>, JournalError> {
        if !self.contains(run_id) {
            return Err(JournalError::UnknownRun(run_id));
        }
        read_events(&self.path_for(run_id))
    }

    /// Last event of a run, if any.
    pub fn last_event(&self, run_id: RunId) -> Result<Option<AgentEvent>, JournalError> {
        Ok(self.load_by_run(run_id)?.pop())
    }

    /// Cursor-paginated trajectory view.
    ///
    /// The filter is applied before pagination so `limit` is a real page
    /// size. `limit` is clamped to `page_cap`. A cursor from a different
    /// run yields an empty page with `has_more = false`.
    pub fn load_trajectory(
        &self,
        run_id: RunId,
        filter: &TrajectoryFilter,
        cursor: Option<&Cursor>,
        limit: usize,
        page_cap: usize,
    ) -> Result<TrajectoryPage<AgentEvent>, JournalError> {
        let events = self.load_by_run(run_id)?;
        let matching: Vec<AgentEvent> =
            events.into_iter().filter(|e| filter.matches(e)).collect();
        let total = matching.len();

        let start_after = match cursor {
            Some(c) => {
                let (seq, id) = c
                    .decode()
                    .ok_or_else(|| JournalError::BadCursor(c.to_string()))?;
                // A cursor naming an event this run never produced comes
                // from another run: empty page, no continuation.
                let known = matching.iter().any(|e| e.seq == seq && e.id == id);
                if !known {
                    return Ok(TrajectoryPage { entries: Vec::new(), cursor: None, has_more: false, total });
                }
                Some(seq)
            }
            None => None,
        };

        let limit = limit.clamp(1, page_cap.max(1));
        let mut entries: Vec<AgentEvent> = matching
            .into_iter()
            .filter(|e| start_after.map(|s| e.seq > s).unwrap_or(true))
            .collect();
        let has_more = entries.len() > limit;
        entries.truncate(limit);
        let cursor = if has_more {
            entries.last().map(|e| Cursor::encode(e.seq, e.id.as_str()))
        } else {
            None
        };
        Ok(TrajectoryPage { entries, cursor, has_more, total })
    }

    /// Count-by-kind, token totals, cost, and wall-clock span.
    pub fn stats(&self, run_id: RunId) -> Result<JournalStats, JournalError> {
        let events = self.load_by_run(run_id)?;
        let mut stats = JournalStats { count: events.len(), ..JournalStats::default() };
        for event in &events {
            if let Some(kind) = event.kind() {
                *stats.by_kind.entry(kind).or_insert(0) += 1;
            }
            if let atc_core::EventPayload::Cost { tokens_in, tokens_out, cost_usd, .. } =
                &event.payload
            {
                stats.tokens_in += tokens_in;
                stats.tokens_out += tokens_out;
                stats.cost_usd += cost_usd;
            }
        }
        if let (Some(first), Some(last)) = (events.first(), events.last()) {
            stats.span_ms = last.at_ms.saturating_sub(first.at_ms);
        }
        Ok(stats)
    }

    /// Checkpoint-flagged events in seq order.
    pub fn list_checkpoints(&self, run_id: RunId) -> Result<Vec<AgentEvent>, JournalError> {
        Ok(self
            .load_by_run(run_id)?
            .into_iter()
            .filter(|e| e.checkpoint)
            .collect())
    }

    /// Copy the parent's prefix `[1..=cutoff_seq]` into a fresh journal
    /// for `new_run_id`, rewriting `run_id` on each copied event.
    ///
    /// The parent is never modified. Returns the number of events copied.
    /// Used by fork, rewind, resume, and replay.
    pub fn copy_prefix(
        &self,
        parent: RunId,
        new_run_id: RunId,
        cutoff_seq: u64,
    ) -> Result<usize, JournalError> {
        let events = self.load_by_run(parent)?;
        let entry = self.attach(new_run_id)?;
        let mut log = entry.lock();
        if log.last_seq != 0 {
            return Err(JournalError::NotEmpty(new_run_id));
        }
        let mut copied = 0usize;
        for mut event in events {
            if event.seq > cutoff_seq {
                break;
            }
            // Terminal events never cross into a derived run; the new head
            // must be able to continue appending.
            if event.is_terminal() {
                break;
            }
            event.run_id = new_run_id;
            let mut line = serde_json::to_string(&event)?;
            line.push('\n');
            log.file.write_all(line.as_bytes())?;
            log.last_seq = event.seq;
            log.last_at_ms = event.at_ms;
            copied += 1;
        }
        log.file.flush()?;
        log.file.sync_data()?;
        tracing::debug!(%parent, new_run = %new_run_id, copied, "journal prefix copied");
        Ok(copied)
    }

    /// Register an empty journal for a new run.
    pub fn create(&self, run_id: RunId) -> Result<(), JournalError> {
        self.attach(run_id)?;
        Ok(())
    }
}

/// Read every well-formed line of a journal file.
///
/// A torn final line (a reader racing the appender's flush) is skipped;
/// all fully written lines before it parse cleanly.
fn read_events(path: &Path) -> Result<Vec<AgentEvent>, JournalError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let reader = BufReader::new(file);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<AgentEvent>(&line) {
            Ok(event) => events.push(event),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skipping malformed journal line");
            }
        }
    }
    Ok(events)
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
