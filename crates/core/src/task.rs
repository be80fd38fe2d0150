// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tasks: units of work description.

use crate::project::ProjectId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a task.
    pub struct TaskId("tsk-");
}

/// Status of a task, derived from its runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Cancelled)
    }
}

/// A unit of work description. A task may have 0..N runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub prompt: String,
    pub status: TaskStatus,
    pub created_at_ms: u64,
}

impl Task {
    pub fn new(project_id: ProjectId, title: impl Into<String>, prompt: impl Into<String>, epoch_ms: u64) -> Self {
        Self {
            id: TaskId::new(),
            project_id,
            title: title.into(),
            prompt: prompt.into(),
            status: TaskStatus::Pending,
            created_at_ms: epoch_ms,
        }
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            title: String = "test-task",
            prompt: String = "do the thing",
        }
        set {
            id: TaskId = TaskId::new(),
            project_id: ProjectId = ProjectId::new(),
            status: TaskStatus = TaskStatus::Pending,
            created_at_ms: u64 = 1_000_000,
        }
    }
}
