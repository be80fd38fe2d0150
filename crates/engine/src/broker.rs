// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event stream broker: per-topic fan-out over bounded channels.
//!
//! Publishing never blocks: a subscriber whose queue is full is
//! disconnected. A subscriber joining mid-run drains the journal up to
//! its tail first ("replay then live" with `since_seq`), which the
//! daemon surface implements on top of [`Broker::subscribe`].

use atc_core::{AgentEvent, ProjectId, RunId, RunStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Fan-out channel label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Run(RunId),
    Project(ProjectId),
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Run(id) => write!(f, "run:{}", id),
            Topic::Project(id) => write!(f, "project:{}", id),
        }
    }
}

/// One item on a subscription stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// A journaled event, in seq order per run.
    Event(AgentEvent),
    /// Run lifecycle notice published at dispatch.
    RunStarted { run_id: RunId },
    /// Run lifecycle notice published at terminal reconciliation.
    RunCompleted { run_id: RunId, status: RunStatus },
}

/// A live subscription; dropping it unsubscribes.
pub struct Subscription {
    pub rx: mpsc::Receiver<StreamItem>,
}

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<StreamItem>,
}

/// Per-topic fan-out with backpressure by disconnection.
pub struct Broker {
    queue_depth: usize,
    topics: Mutex<HashMap<Topic, Vec<Subscriber>>>,
    next_id: Mutex<u64>,
}

impl Broker {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            queue_depth: queue_depth.max(1),
            topics: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
        }
    }

    /// Attach a subscriber to a topic.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_depth);
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        self.topics.lock().entry(topic).or_default().push(Subscriber { id, tx });
        Subscription { rx }
    }

    /// Publish to one topic. Never blocks; slow or closed subscribers
    /// are dropped.
    pub fn publish(&self, topic: Topic, item: StreamItem) {
        let mut topics = self.topics.lock();
        let Some(subscribers) = topics.get_mut(&topic) else {
            return;
        };
        subscribers.retain(|sub| match sub.tx.try_send(item.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(%topic, subscriber = sub.id, "subscriber queue full; disconnecting");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        if subscribers.is_empty() {
            topics.remove(&topic);
        }
    }

    /// Publish a journaled event to its run and project topics.
    pub fn publish_event(&self, project_id: ProjectId, event: &AgentEvent) {
        self.publish(Topic::Run(event.run_id), StreamItem::Event(event.clone()));
        self.publish(Topic::Project(project_id), StreamItem::Event(event.clone()));
    }

    /// Publish a run lifecycle notice to both topics.
    pub fn publish_notice(&self, project_id: ProjectId, run_id: RunId, item: StreamItem) {
        self.publish(Topic::Run(run_id), item.clone());
        self.publish(Topic::Project(project_id), item);
    }

    /// Number of live subscribers on a topic.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topics.lock().get(&topic).map(|subs| subs.len()).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
