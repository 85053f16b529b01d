use crate::{
    CaptureToken, DeliveryPath, Directive, LinkRegistry, Teardown, WorkerId,
    tests::support::{RecordingFallback, drain},
};

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;

fn registry(fallback: &Arc<RecordingFallback>) -> LinkRegistry {
    LinkRegistry::new(fallback.clone())
}

fn start(token: &str) -> Directive {
    Directive::StartCapture {
        token: CaptureToken::from(token),
    }
}

/// WHAT: Directives go over the registered channel when one exists
/// WHY: The channel is the ordered, reliable path
#[test]
fn given_registered_channel_when_sending_then_delivered_over_channel() {
    // Given: Worker 5 connected
    let fallback = Arc::new(RecordingFallback::refusing());
    let mut links = registry(&fallback);
    let (tx, mut rx) = mpsc::channel(4);
    links.register_channel(WorkerId(5), tx);

    // When: Sending a directive
    let outcome = links.send(WorkerId(5), Directive::Pause);

    // Then: Delivered over the channel, fallback untouched
    assert_eq!(outcome.unwrap().path, DeliveryPath::Channel);
    assert_eq!(drain(&mut rx), vec![Directive::Pause]);
    assert!(fallback.sent().is_empty());
}

/// WHAT: Unknown workers are reached through the fallback
/// WHY: A worker whose channel is not up yet may still be reachable
#[test]
fn given_no_channel_when_sending_then_fallback_used() {
    let fallback = Arc::new(RecordingFallback::accepting());
    let mut links = registry(&fallback);

    let outcome = links.send(WorkerId(9), Directive::Mute);

    assert_eq!(outcome.unwrap().path, DeliveryPath::Fallback);
    assert_eq!(fallback.sent(), vec![(WorkerId(9), Directive::Mute)]);
}

/// WHAT: A failed fallback yields Dropped with the directive
/// WHY: Callers decide whether a silent drop is acceptable
#[test]
fn given_failing_fallback_when_sending_then_dropped_returned() {
    let fallback = Arc::new(RecordingFallback::refusing());
    let mut links = registry(&fallback);

    let dropped = links.send(WorkerId(9), Directive::Resume).unwrap_err();

    assert_eq!(dropped.worker_id, WorkerId(9));
    assert_eq!(dropped.directive, Directive::Resume);
    assert_eq!(dropped.reason, "worker unreachable");
}

/// WHAT: A closed channel falls back instead of failing
/// WHY: The worker may have gone away without the teardown being processed
#[test]
fn given_closed_channel_when_sending_then_fallback_attempted_once() {
    // Given: Worker 5 registered, then its receiver dropped
    let fallback = Arc::new(RecordingFallback::refusing());
    let mut links = registry(&fallback);
    let (tx, rx) = mpsc::channel(4);
    links.register_channel(WorkerId(5), tx);
    drop(rx);

    // When: Sending
    let outcome = links.send(WorkerId(5), Directive::Unmute);

    // Then: Exactly one fallback attempt, reported as dropped
    assert!(outcome.is_err());
    assert_eq!(fallback.sent(), vec![(WorkerId(5), Directive::Unmute)]);
    assert!(!links.is_connected(WorkerId(5)));
}

/// WHAT: A pending handoff is delivered once when its worker registers
/// WHY: The start command can arrive before the worker's channel exists
#[test]
fn given_pending_handoff_when_worker_registers_then_start_delivered_once() {
    // Given: A token stashed for worker 7
    let fallback = Arc::new(RecordingFallback::refusing());
    let mut links = registry(&fallback);
    links.stash_handoff(WorkerId(7), CaptureToken::from("token-7"));

    // When: Worker 7 registers
    let (tx, mut rx) = mpsc::channel(4);
    links.register_channel(WorkerId(7), tx);

    // Then: One StartCapture with the original token, handoff cleared
    assert_eq!(drain(&mut rx), vec![start("token-7")]);
    assert!(links.pending_handoff().is_none());

    // And re-registering does not deliver it again
    let (tx, mut rx) = mpsc::channel(4);
    links.register_channel(WorkerId(7), tx);
    assert!(drain(&mut rx).is_empty());
}

/// WHAT: A handoff is only consumed by its own worker
/// WHY: Another worker connecting must not steal the capture token
#[test]
fn given_pending_handoff_when_other_worker_registers_then_handoff_kept() {
    let fallback = Arc::new(RecordingFallback::refusing());
    let mut links = registry(&fallback);
    links.stash_handoff(WorkerId(7), CaptureToken::from("token-7"));

    let (tx, mut rx) = mpsc::channel(4);
    links.register_channel(WorkerId(8), tx);

    assert!(drain(&mut rx).is_empty());
    assert_eq!(links.pending_handoff().unwrap().worker_id, WorkerId(7));
}

/// WHAT: A newer handoff supersedes an older one
/// WHY: At most one handoff is outstanding
#[test]
fn given_two_handoffs_when_stashing_then_latest_wins() {
    let fallback = Arc::new(RecordingFallback::refusing());
    let mut links = registry(&fallback);
    links.stash_handoff(WorkerId(7), CaptureToken::from("old"));
    links.stash_handoff(WorkerId(8), CaptureToken::from("new"));

    let (tx7, mut rx7) = mpsc::channel(4);
    links.register_channel(WorkerId(7), tx7);
    let (tx8, mut rx8) = mpsc::channel(4);
    links.register_channel(WorkerId(8), tx8);

    assert!(drain(&mut rx7).is_empty());
    assert_eq!(drain(&mut rx8), vec![start("new")]);
}

/// WHAT: Registering again replaces the previous channel
/// WHY: A reconnecting worker must receive directives on its new channel
#[test]
fn given_reconnected_worker_when_sending_then_new_channel_used() {
    let fallback = Arc::new(RecordingFallback::refusing());
    let mut links = registry(&fallback);
    let (old_tx, mut old_rx) = mpsc::channel(4);
    links.register_channel(WorkerId(5), old_tx);
    let (new_tx, mut new_rx) = mpsc::channel(4);
    links.register_channel(WorkerId(5), new_tx);

    links.send(WorkerId(5), Directive::Pause).unwrap();

    assert!(drain(&mut old_rx).is_empty());
    assert_eq!(drain(&mut new_rx), vec![Directive::Pause]);
    assert!(links.is_connected(WorkerId(5)));
}

/// WHAT: A replaced channel closes on the worker side
/// WHY: The superseded connection must end instead of idling until its peer leaves
#[tokio::test]
async fn given_teardown_hook_when_worker_reregisters_then_old_receiver_closes() {
    // Given: Worker 5 registered with teardown reporting
    let fallback = Arc::new(RecordingFallback::refusing());
    let (teardown_tx, _teardown_rx) = mpsc::unbounded_channel();
    let mut links = LinkRegistry::new(fallback).with_teardown(teardown_tx);
    let (old_tx, mut old_rx) = mpsc::channel(4);
    links.register_channel(WorkerId(5), old_tx);

    // When: It registers a second channel
    let (new_tx, mut new_rx) = mpsc::channel(4);
    links.register_channel(WorkerId(5), new_tx);

    // Then: The old receiver ends, the new one stays open
    let closed = tokio::time::timeout(Duration::from_secs(1), old_rx.recv()).await;
    assert_eq!(closed, Ok(None));

    links.send(WorkerId(5), Directive::Pause).unwrap();
    assert_eq!(new_rx.recv().await, Some(Directive::Pause));
}

/// WHAT: A stale teardown does not remove a newer registration
/// WHY: The old channel's close can be observed after the worker reconnected
#[test]
fn given_stale_link_id_when_unregistering_then_current_channel_kept() {
    let fallback = Arc::new(RecordingFallback::refusing());
    let mut links = registry(&fallback);
    let (old_tx, _old_rx) = mpsc::channel(4);
    let old_link = links.register_channel(WorkerId(5), old_tx);
    let (new_tx, _new_rx) = mpsc::channel(4);
    let new_link = links.register_channel(WorkerId(5), new_tx);

    assert!(!links.unregister(WorkerId(5), old_link));
    assert!(links.is_connected(WorkerId(5)));

    assert!(links.unregister(WorkerId(5), new_link));
    assert!(!links.is_connected(WorkerId(5)));
}

/// WHAT: Dropping a worker's receiver fires the teardown hook
/// WHY: Closed channels must leave the registry without polling
#[tokio::test]
async fn given_teardown_hook_when_receiver_dropped_then_teardown_reported() {
    // Given: A registry reporting teardowns
    let fallback = Arc::new(RecordingFallback::refusing());
    let (teardown_tx, mut teardown_rx) = mpsc::unbounded_channel();
    let mut links = LinkRegistry::new(fallback).with_teardown(teardown_tx);
    let (tx, rx) = mpsc::channel(4);
    let link_id = links.register_channel(WorkerId(5), tx);

    // When: The worker side goes away
    drop(rx);

    // Then: The hook reports that exact registration
    let teardown = teardown_rx.recv().await.unwrap();
    assert_eq!(
        teardown,
        Teardown {
            worker_id: WorkerId(5),
            link_id,
        }
    );
    assert!(links.unregister(teardown.worker_id, teardown.link_id));
}
