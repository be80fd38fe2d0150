// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane configuration: TOML file with environment overrides.
//!
//! All keys have defaults; unknown keys in the file are ignored.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunables recognised by the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on concurrently running plan steps.
    pub max_parallel: usize,
    /// Round ceiling for ping-pong plans when the plan does not set one.
    pub ping_pong_max_rounds: u32,
    /// Ceiling on steps a hierarchical coordinator may emit.
    pub max_team_size: usize,
    /// How long an `ask` decision waits before timing out.
    pub approval_timeout_ms: u64,
    /// Worker dispatch acknowledgement deadline per attempt.
    pub worker_dispatch_timeout_ms: u64,
    /// Maximum dispatch retries before the run fails.
    pub dispatch_retry_cap: u32,
    /// Grace period after cancel before a terminal event is synthesized.
    pub cancel_grace_ms: u64,
    /// Maximum accepted request frame size in bytes.
    pub max_request_body_size: usize,
    /// Maximum accepted query string length.
    pub max_query_length: usize,
    /// Profile applied when a run does not name one.
    pub default_policy_profile: String,
    /// Hard cap for trajectory/audit page sizes; larger limits are clamped.
    pub trajectory_page_cap: usize,
    /// Bounded per-subscriber broker queue depth.
    pub subscriber_queue_depth: usize,
    /// Non-terminal runs older than this are reconciled to failed on restart.
    pub stale_run_threshold_ms: u64,
    /// Root state directory.
    pub state_dir: PathBuf,
    /// Directory for log files.
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let base = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("atc");
        Self {
            max_parallel: 4,
            ping_pong_max_rounds: 6,
            max_team_size: 8,
            approval_timeout_ms: 10 * 60 * 1000,
            worker_dispatch_timeout_ms: 10_000,
            dispatch_retry_cap: 4,
            cancel_grace_ms: 30_000,
            max_request_body_size: 1024 * 1024,
            max_query_length: 4096,
            default_policy_profile: "headless-safe-sandbox".to_string(),
            trajectory_page_cap: 500,
            subscriber_queue_depth: 256,
            stale_run_threshold_ms: 60_000,
            state_dir: base.join("state"),
            log_dir: base.join("log"),
        }
    }
}

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Default config file location (`~/.config/atc/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("atc").join("config.toml"))
    }

    /// Load from a TOML file, falling back to defaults when absent,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)
                    .map_err(|source| ConfigError::Read { path: p.to_path_buf(), source })?;
                toml::from_str(&text)
                    .map_err(|source| ConfigError::Parse { path: p.to_path_buf(), source })?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `ATC_*` environment overrides.
    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("ATC_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("ATC_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Ok(v) = std::env::var("ATC_MAX_PARALLEL") {
            if let Ok(n) = v.parse() {
                self.max_parallel = n;
            }
        }
        if let Ok(v) = std::env::var("ATC_APPROVAL_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.approval_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("ATC_CANCEL_GRACE_MS") {
            if let Ok(n) = v.parse() {
                self.cancel_grace_ms = n;
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
