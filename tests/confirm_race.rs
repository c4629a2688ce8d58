// tests/confirm_race.rs
//
// Concurrent confirmations on the same fresh draft must reach the
// publisher exactly once. The mock publisher holds its call open so the
// loser really does observe the in-flight transition.

use std::sync::Arc;

use pagewatch::draft::DraftLifecycle;
use pagewatch::publish::MockPublisher;
use pagewatch::retry::RetryPolicy;
use pagewatch::ConfirmOutcome;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_confirms_publish_exactly_once() {
    let publisher = Arc::new(MockPublisher::with_delay_ms(100));
    let lifecycle = Arc::new(DraftLifecycle::new(
        publisher.clone(),
        3600,
        RetryPolicy::once(),
    ));

    let id = lifecycle.create_draft("summary", "+line", "https://example.com");

    let a = {
        let lifecycle = lifecycle.clone();
        let id = id.clone();
        tokio::spawn(async move { lifecycle.confirm(&id).await })
    };
    let b = {
        let lifecycle = lifecycle.clone();
        let id = id.clone();
        tokio::spawn(async move { lifecycle.confirm(&id).await })
    };

    let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
    assert_eq!(publisher.calls(), 1, "publisher invoked exactly once");

    let published = [&ra, &rb]
        .iter()
        .filter(|o| matches!(o, ConfirmOutcome::Published { .. }))
        .count();
    assert_eq!(published, 1, "exactly one winner, got {ra:?} / {rb:?}");

    let loser = if matches!(ra, ConfirmOutcome::Published { .. }) {
        rb
    } else {
        ra
    };
    assert!(
        matches!(
            loser,
            ConfirmOutcome::NotPending | ConfirmOutcome::AlreadyPublished
        ),
        "loser must observe the in-flight transition or its result, got {loser:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn confirm_stampede_publishes_exactly_once() {
    let publisher = Arc::new(MockPublisher::with_delay_ms(20));
    let lifecycle = Arc::new(DraftLifecycle::new(
        publisher.clone(),
        3600,
        RetryPolicy::once(),
    ));
    let id = lifecycle.create_draft("summary", "+line", "https://example.com");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let lifecycle = lifecycle.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move { lifecycle.confirm(&id).await }));
    }

    let mut published = 0usize;
    for h in handles {
        if matches!(h.await.unwrap(), ConfirmOutcome::Published { .. }) {
            published += 1;
        }
    }

    assert_eq!(publisher.calls(), 1);
    assert_eq!(published, 1);
}
