// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event streaming: journal replay from `since_seq`, then live fan-out.
//!
//! Subscribing to the broker before reading the journal closes the gap
//! between replay and live; anything received twice is dropped by seq.

use atc_core::{Clock, RunId};
use atc_engine::{Runtime, StreamItem, Topic};
use atc_wire::{write_message, ProtocolError, Response};
use std::sync::Arc;
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;

pub(crate) async fn stream_run<C: Clock>(
    runtime: &Arc<Runtime<C>>,
    stream: &mut UnixStream,
    run_id: RunId,
    since_seq: Option<u64>,
    shutdown: &CancellationToken,
) -> Result<(), ProtocolError> {
    // Attach live first so no event can fall between replay and live.
    let mut subscription = runtime.broker().subscribe(Topic::Run(run_id));

    let events = match runtime.journal().load_by_run(run_id) {
        Ok(events) => events,
        Err(err) => {
            let kind = err.kind();
            write_message(stream, &Response::error(kind, err.to_string())).await?;
            return Ok(());
        }
    };

    let floor = since_seq.unwrap_or(0);
    let mut last_sent = floor;
    for event in events.into_iter().filter(|e| e.seq > floor) {
        last_sent = event.seq;
        write_message(stream, &Response::Event { event }).await?;
    }
    write_message(stream, &Response::Live).await?;

    loop {
        let item = tokio::select! {
            item = subscription.rx.recv() => item,
            () = shutdown.cancelled() => return Ok(()),
        };
        match item {
            Some(StreamItem::Event(event)) => {
                // Replay overlap: the broker delivered something the
                // journal scan already covered.
                if event.seq <= last_sent {
                    continue;
                }
                last_sent = event.seq;
                let terminal = event.is_terminal();
                write_message(stream, &Response::Event { event }).await?;
                if terminal {
                    return Ok(());
                }
            }
            Some(StreamItem::RunCompleted { .. }) => return Ok(()),
            Some(StreamItem::RunStarted { .. }) => {}
            // Broker dropped us (slow consumer) or the topic closed.
            None => return Ok(()),
        }
    }
}
