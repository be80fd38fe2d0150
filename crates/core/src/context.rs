// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task-scoped retrieval bundles handed to workers at dispatch.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};

/// A code snippet included in a context pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub text: String,
}

/// Task-scoped retrieval bundle built once per task and reused by runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextPack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snippets: Vec<Snippet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ContextPack {
    pub fn for_task(task_id: TaskId) -> Self {
        Self { task_id: Some(task_id), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.symbols.is_empty() && self.snippets.is_empty() && self.summary.is_none()
    }
}
