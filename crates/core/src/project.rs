// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Projects: cloned or adopted source trees owned by one tenant.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a project.
    pub struct ProjectId("prj-");
}

crate::define_id! {
    /// Unique identifier for a tenant.
    pub struct TenantId("tnt-");
}

/// A cloned or adopted source tree owned by one tenant.
///
/// A project exclusively owns its agents, tasks, runs and plans;
/// deletion cascades downward along ownership edges only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub tenant_id: TenantId,
    pub name: String,
    pub workspace_path: PathBuf,
    /// Git hosting provider label (e.g. "github"); adapters out of scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub config: HashMap<String, String>,
    pub created_at_ms: u64,
}

impl Project {
    pub fn new(name: impl Into<String>, tenant_id: TenantId, workspace_path: PathBuf, epoch_ms: u64) -> Self {
        Self {
            id: ProjectId::new(),
            tenant_id,
            name: name.into(),
            workspace_path,
            provider: None,
            config: HashMap::new(),
            created_at_ms: epoch_ms,
        }
    }
}

crate::builder! {
    pub struct ProjectBuilder => Project {
        into {
            name: String = "test-project",
            workspace_path: PathBuf = "/tmp/test-project",
        }
        set {
            id: ProjectId = ProjectId::new(),
            tenant_id: TenantId = TenantId::new(),
            config: HashMap<String, String> = HashMap::new(),
            created_at_ms: u64 = 1_000_000,
        }
        option {
            provider: String = None,
        }
    }
}
