// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `atcd`: the agent traffic control daemon.

use atc_adapters::WorkerRegistry;
use atc_core::Config;
use atc_daemon::env::Paths;
use atc_daemon::lifecycle;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(paths: &Paths) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::fs::create_dir_all(&paths.log_dir).is_ok() {
        let appender = tracing_appender::rolling::daily(&paths.log_dir, "atcd.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        None
    }
}

fn main() -> std::process::ExitCode {
    let config = match Config::load(Config::default_path().as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("atcd: {}", err);
            return std::process::ExitCode::FAILURE;
        }
    };
    let paths = Paths::from_config(&config);
    let _log_guard = init_tracing(&paths);

    let lock = match lifecycle::acquire_lock(&paths) {
        Ok(lock) => lock,
        Err(err) => {
            tracing::error!(%err, "startup aborted");
            eprintln!("atcd: {}", err);
            return std::process::ExitCode::FAILURE;
        }
    };

    // Worker backends are deployment-specific; a bare daemon still
    // serves queries, policies, sessions, and audit.
    let workers = Arc::new(WorkerRegistry::new());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(%err, "tokio runtime failed");
            return std::process::ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(async move {
        let (engine, paths) = lifecycle::bootstrap(config, workers)?;
        lifecycle::run(engine, paths, lock).await
    });

    match outcome {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "daemon failed");
            eprintln!("atcd: {}", err);
            std::process::ExitCode::FAILURE
        }
    }
}
