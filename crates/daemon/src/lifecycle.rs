// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: single-instance lock, storage bring-up, recovery,
//! serve loop, and snapshot on shutdown.

use crate::env::Paths;
use crate::listener;
use atc_adapters::WorkerRegistry;
use atc_core::{Config, SystemClock};
use atc_engine::{
    ApprovalRegistry, Broker, Registry, RegistrySnapshot, Runtime, RuntimeDeps,
};
use atc_policy::ProfileStore;
use atc_storage::{load_snapshot, save_snapshot, AuditLog, EventJournal};
use fs2::FileExt;
use std::fs::File;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Daemon startup failures.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("another atcd instance holds the lock at {0}")]
    AlreadyRunning(std::path::PathBuf),
    #[error("storage bring-up failed: {0}")]
    Storage(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Held for the daemon's lifetime; dropping releases the flock.
#[derive(Debug)]
pub struct InstanceLock {
    _file: File,
}

/// Take the single-instance lock, or report who has it.
pub fn acquire_lock(paths: &Paths) -> Result<InstanceLock, DaemonError> {
    if let Some(parent) = paths.lock_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(&paths.lock_file)?;
    file.try_lock_exclusive()
        .map_err(|_| DaemonError::AlreadyRunning(paths.lock_file.clone()))?;
    Ok(InstanceLock { _file: file })
}

/// Build the runtime: storage, snapshot, registry, recovery.
pub fn bootstrap(
    config: Config,
    workers: Arc<WorkerRegistry>,
) -> Result<(Arc<Runtime<SystemClock>>, Paths), DaemonError> {
    let paths = Paths::from_config(&config);

    let journal = EventJournal::open(&paths.journal_dir)
        .map_err(|e| DaemonError::Storage(e.to_string()))?;
    let audit =
        AuditLog::open(&paths.audit_file).map_err(|e| DaemonError::Storage(e.to_string()))?;
    let policies = ProfileStore::open(&paths.policies_dir)
        .map_err(|e| DaemonError::Storage(e.to_string()))?;

    // Snapshot is an optimisation only; the journal stays authoritative.
    let registry = match load_snapshot::<RegistrySnapshot>(&paths.snapshot_file) {
        Some(snapshot) => {
            tracing::info!(runs = snapshot.runs.len(), "registry snapshot loaded");
            Registry::from_snapshot(snapshot)
        }
        None => Registry::new(),
    };

    let deps = RuntimeDeps {
        journal: Arc::new(journal),
        audit: Arc::new(audit),
        registry: Arc::new(registry),
        approvals: Arc::new(ApprovalRegistry::new()),
        broker: Arc::new(Broker::new(config.subscriber_queue_depth)),
        policies: Arc::new(policies),
        workers,
    };
    let runtime = Runtime::new(deps, config, SystemClock);

    match runtime.recover() {
        Ok(report) => tracing::info!(?report, "recovery finished"),
        Err(err) => tracing::error!(%err, "recovery failed; continuing with journal state"),
    }

    Ok((runtime, paths))
}

/// Serve until SIGTERM/SIGINT or a shutdown request, then snapshot.
pub async fn run(
    runtime: Arc<Runtime<SystemClock>>,
    paths: Paths,
    _lock: InstanceLock,
) -> Result<(), DaemonError> {
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(term) => term,
                Err(err) => {
                    tracing::error!(%err, "sigterm hook failed");
                    let _ = ctrl_c.await;
                    signal_token.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        tracing::info!("shutdown signal received");
        signal_token.cancel();
    });

    listener::serve(Arc::clone(&runtime), &paths, shutdown.clone()).await?;

    // Quiesce the engine before snapshotting.
    runtime.begin_shutdown();
    let snapshot = runtime.registry().snapshot();
    if let Err(err) = save_snapshot(&paths.snapshot_file, &snapshot) {
        tracing::error!(%err, "snapshot save failed");
    }
    let _ = std::fs::remove_file(&paths.socket);
    tracing::info!("atcd stopped");
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
