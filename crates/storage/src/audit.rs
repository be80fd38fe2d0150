// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global append-only audit log with the journal's cursor contract.

use crate::cursor::{Cursor, TrajectoryPage};
use crate::journal::JournalError;
use atc_core::{AuditEntry, ProjectId, RunId};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Optional predicates applied server-side before pagination.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AuditFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl AuditFilter {
    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(run_id) = self.run_id {
            if entry.run_id != Some(run_id) {
                return false;
            }
        }
        if let Some(project_id) = self.project_id {
            if entry.project_id != Some(project_id) {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            if &entry.actor != actor {
                return false;
            }
        }
        true
    }
}

/// Single-file append-only audit journal.
pub struct AuditLog {
    path: PathBuf,
    appender: Mutex<AuditAppender>,
}

struct AuditAppender {
    seq: u64,
    file: File,
}

impl AuditLog {
    /// Open (or create) the audit log file and count existing entries.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let seq = if path.exists() { read_entries(&path)?.len() as u64 } else { 0 };
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, appender: Mutex::new(AuditAppender { seq, file }) })
    }

    /// Append one entry durably. Entries are immutable once written.
    pub fn append(&self, entry: &AuditEntry) -> Result<u64, JournalError> {
        let mut appender = self.appender.lock();
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        appender.file.write_all(line.as_bytes())?;
        appender.file.flush()?;
        appender.file.sync_data()?;
        appender.seq += 1;
        Ok(appender.seq)
    }

    /// Cursor-paginated view, oldest first. `limit` is clamped to
    /// `page_cap`.
    pub fn page(
        &self,
        filter: &AuditFilter,
        cursor: Option<&Cursor>,
        limit: usize,
        page_cap: usize,
    ) -> Result<TrajectoryPage<AuditEntry>, JournalError> {
        let matching: Vec<(u64, AuditEntry)> = read_entries(&self.path)?
            .into_iter()
            .enumerate()
            .map(|(i, e)| (i as u64 + 1, e))
            .filter(|(_, e)| filter.matches(e))
            .collect();
        let total = matching.len();

        let start_after = match cursor {
            Some(c) => {
                let (seq, id) = c
                    .decode()
                    .ok_or_else(|| JournalError::BadCursor(c.to_string()))?;
                let known = matching.iter().any(|(s, e)| *s == seq && e.id == id);
                if !known {
                    return Ok(TrajectoryPage { entries: Vec::new(), cursor: None, has_more: false, total });
                }
                Some(seq)
            }
            None => None,
        };

        let limit = limit.clamp(1, page_cap.max(1));
        let mut remaining: Vec<(u64, AuditEntry)> = matching
            .into_iter()
            .filter(|(s, _)| start_after.map(|a| *s > a).unwrap_or(true))
            .collect();
        let has_more = remaining.len() > limit;
        remaining.truncate(limit);
        let cursor = if has_more {
            remaining.last().map(|(s, e)| Cursor::encode(*s, e.id.as_str()))
        } else {
            None
        };
        Ok(TrajectoryPage {
            entries: remaining.into_iter().map(|(_, e)| e).collect(),
            cursor,
            has_more,
            total,
        })
    }
}

fn read_entries(path: &Path) -> Result<Vec<AuditEntry>, JournalError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skipping malformed audit line");
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
