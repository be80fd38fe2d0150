// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atc_core::{AgentEvent, AgentId, EventPayload, TaskId};

fn event(run_id: RunId, seq: u64) -> AgentEvent {
    let mut ev = AgentEvent::new(
        run_id,
        TaskId::new(),
        AgentId::new(),
        1_000,
        EventPayload::Thought { text: format!("t{}", seq) },
    );
    ev.seq = seq;
    ev
}

#[tokio::test]
async fn subscribers_see_events_in_publish_order() {
    let broker = Broker::new(16);
    let run_id = RunId::new();
    let mut sub = broker.subscribe(Topic::Run(run_id));

    for seq in 1..=3 {
        broker.publish(Topic::Run(run_id), StreamItem::Event(event(run_id, seq)));
    }

    for expected in 1..=3u64 {
        match sub.rx.recv().await {
            Some(StreamItem::Event(ev)) => assert_eq!(ev.seq, expected),
            other => panic!("unexpected item: {:?}", other),
        }
    }
}

#[tokio::test]
async fn publish_event_reaches_run_and_project_topics() {
    let broker = Broker::new(16);
    let run_id = RunId::new();
    let project_id = ProjectId::new();
    let mut run_sub = broker.subscribe(Topic::Run(run_id));
    let mut project_sub = broker.subscribe(Topic::Project(project_id));

    broker.publish_event(project_id, &event(run_id, 1));

    assert!(matches!(run_sub.rx.recv().await, Some(StreamItem::Event(_))));
    assert!(matches!(project_sub.rx.recv().await, Some(StreamItem::Event(_))));
}

#[tokio::test]
async fn slow_subscriber_is_disconnected_not_blocking() {
    let broker = Broker::new(2);
    let run_id = RunId::new();
    let _slow = broker.subscribe(Topic::Run(run_id));
    assert_eq!(broker.subscriber_count(Topic::Run(run_id)), 1);

    // Queue depth is 2; the third publish overflows and drops the
    // subscriber without blocking the publisher.
    for seq in 1..=3 {
        broker.publish(Topic::Run(run_id), StreamItem::Event(event(run_id, seq)));
    }
    assert_eq!(broker.subscriber_count(Topic::Run(run_id)), 0);
}

#[tokio::test]
async fn dropped_subscription_is_pruned_on_publish() {
    let broker = Broker::new(4);
    let run_id = RunId::new();
    let sub = broker.subscribe(Topic::Run(run_id));
    drop(sub);
    broker.publish(Topic::Run(run_id), StreamItem::RunStarted { run_id });
    assert_eq!(broker.subscriber_count(Topic::Run(run_id)), 0);
}

#[tokio::test]
async fn publish_without_subscribers_is_a_no_op() {
    let broker = Broker::new(4);
    broker.publish(Topic::Run(RunId::new()), StreamItem::RunStarted { run_id: RunId::new() });
}

#[tokio::test]
async fn late_subscriber_sees_only_later_events() {
    let broker = Broker::new(16);
    let run_id = RunId::new();
    broker.publish(Topic::Run(run_id), StreamItem::Event(event(run_id, 1)));

    let mut sub = broker.subscribe(Topic::Run(run_id));
    broker.publish(Topic::Run(run_id), StreamItem::Event(event(run_id, 2)));

    match sub.rx.recv().await {
        Some(StreamItem::Event(ev)) => assert_eq!(ev.seq, 2),
        other => panic!("unexpected item: {:?}", other),
    }
}

#[test]
fn topic_display_matches_channel_labels() {
    let run_id = RunId::from_string("run-abc");
    let project_id = ProjectId::from_string("prj-xyz");
    assert_eq!(Topic::Run(run_id).to_string(), "run:run-abc");
    assert_eq!(Topic::Project(project_id).to_string(), "project:prj-xyz");
}
