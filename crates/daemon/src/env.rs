// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon environment: socket, lock, and state paths.

use atc_core::Config;
use std::path::PathBuf;

/// Resolved filesystem layout for one daemon instance.
#[derive(Debug, Clone)]
pub struct Paths {
    pub socket: PathBuf,
    pub lock_file: PathBuf,
    pub journal_dir: PathBuf,
    pub audit_file: PathBuf,
    pub policies_dir: PathBuf,
    pub snapshot_file: PathBuf,
    pub log_dir: PathBuf,
}

impl Paths {
    /// Derive the layout from configuration, honouring `ATC_SOCKET`.
    pub fn from_config(config: &Config) -> Self {
        let state = &config.state_dir;
        let socket = std::env::var("ATC_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| state.join("atcd.sock"));
        Self {
            socket,
            lock_file: state.join("atcd.lock"),
            journal_dir: state.join("journal"),
            audit_file: state.join("audit.jsonl"),
            policies_dir: state.join("policies"),
            snapshot_file: state.join("registry.snap"),
            log_dir: config.log_dir.clone(),
        }
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
