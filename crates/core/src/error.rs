// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared across the control plane.
//!
//! Every domain error maps to exactly one [`ErrorKind`] so transport
//! adapters can translate 1:1 without inspecting error internals.

use serde::{Deserialize, Serialize};

/// Classification of every error the core recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input (maps to 400)
    Validation,
    /// Entity does not exist (404)
    NotFound,
    /// Duplicate idempotency key, terminal append, preset mutation (409)
    Conflict,
    /// Policy or RBAC refusal (403)
    Forbidden,
    /// Missing or invalid credentials (401)
    Unauthenticated,
    /// LLM or worker backend unavailable (502/503)
    DependencyUnavailable,
    /// Synchronous RPC or search deadline exceeded (504)
    Timeout,
    /// Run terminated by a deny rule
    PolicyDeny,
    /// Approval waiter timed out
    ApprovalTimeout,
    /// Pending approval lost across a process restart
    ApprovalLost,
    /// Post-crash reconciliation of a stale run
    ProcessRestart,
    /// Anything else; never leaks internals to clients
    Internal,
}

crate::simple_display! {
    ErrorKind {
        Validation => "validation",
        NotFound => "not_found",
        Conflict => "conflict",
        Forbidden => "forbidden",
        Unauthenticated => "unauthenticated",
        DependencyUnavailable => "dependency_unavailable",
        Timeout => "timeout",
        PolicyDeny => "policy_deny",
        ApprovalTimeout => "approval_timeout",
        ApprovalLost => "approval_lost",
        ProcessRestart => "process_restart",
        Internal => "internal",
    }
}

impl ErrorKind {
    /// Whether the error is an expected domain outcome rather than a fault.
    pub fn is_domain(&self) -> bool {
        !matches!(self, ErrorKind::Internal | ErrorKind::DependencyUnavailable)
    }
}

/// A classified error with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("{} {} not found", entity, id))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
