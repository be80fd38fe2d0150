// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! zstd-compressed snapshots of serializable registry state.
//!
//! Snapshots only speed up restart; the journal stays the source of
//! truth and a missing or unreadable snapshot is never fatal.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const COMPRESSION_LEVEL: i32 = 3;

/// Snapshot failures.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Write `state` to `path` as zstd-compressed JSON, atomically.
pub fn save_snapshot<T: Serialize>(path: &Path, state: &T) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec(state)?;
    let compressed = zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)?;
    let tmp = path.with_extension("snap.tmp");
    std::fs::write(&tmp, compressed)?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), bytes = json.len(), "snapshot saved");
    Ok(())
}

/// Load a snapshot, returning `None` when absent or unreadable.
pub fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let compressed = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), %err, "snapshot unreadable, ignoring");
            }
            return None;
        }
    };
    let json = match zstd::decode_all(compressed.as_slice()) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "snapshot corrupt, ignoring");
            return None;
        }
    };
    match serde_json::from_slice(&json) {
        Ok(state) => Some(state),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "snapshot schema mismatch, ignoring");
            None
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
