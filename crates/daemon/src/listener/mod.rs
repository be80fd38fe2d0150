// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix-socket listener: request dispatch and event streaming.

mod handlers;
mod stream;

pub use handlers::handle;

use crate::env::Paths;
use atc_core::Clock;
use atc_engine::Runtime;
use atc_wire::{read_message, write_message, ProtocolError, Request, Response};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

/// Bind the socket and serve until `shutdown` fires.
pub async fn serve<C: Clock>(
    runtime: Arc<Runtime<C>>,
    paths: &Paths,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Some(parent) = paths.socket.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // A previous unclean exit can leave a stale socket; the instance
    // lock already guarantees we are the only daemon.
    let _ = std::fs::remove_file(&paths.socket);
    let listener = UnixListener::bind(&paths.socket)?;
    tracing::info!(socket = %paths.socket.display(), "listening");

    loop {
        let stream = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => stream,
                Err(err) => {
                    tracing::warn!(%err, "accept failed");
                    continue;
                }
            },
            () = shutdown.cancelled() => break,
        };
        let runtime = Arc::clone(&runtime);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(err) = connection(runtime, stream, shutdown).await {
                match err {
                    ProtocolError::Closed => {}
                    other => tracing::warn!(err = %other, "connection ended with error"),
                }
            }
        });
    }
    Ok(())
}

/// One connection: a request/response loop, until the peer closes or
/// switches to streaming.
async fn connection<C: Clock>(
    runtime: Arc<Runtime<C>>,
    mut stream: UnixStream,
    shutdown: CancellationToken,
) -> Result<(), ProtocolError> {
    let limit = runtime.config().max_request_body_size;
    loop {
        let request = tokio::select! {
            request = read_message::<Request, _>(&mut stream, limit) => request?,
            () = shutdown.cancelled() => return Ok(()),
        };
        match request {
            Request::Subscribe { run_id, since_seq } => {
                // The connection becomes a one-way event stream.
                return stream::stream_run(&runtime, &mut stream, run_id, since_seq, &shutdown)
                    .await;
            }
            Request::Shutdown => {
                write_message(&mut stream, &Response::Ok).await?;
                tracing::info!("shutdown requested over ipc");
                shutdown.cancel();
                return Ok(());
            }
            other => {
                let response = handle(&runtime, other).await;
                write_message(&mut stream, &response).await?;
            }
        }
    }
}
