//! Event-waiting helpers

use filing_feed::Event;
use std::time::Duration;
use tokio::sync::broadcast;

/// Wait for the first event matching `predicate`
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    predicate: F,
) -> Option<Event>
where
    F: Fn(&Event) -> bool,
{
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await;

    result.unwrap_or(None)
}

/// Collect events until `stop_predicate` matches (inclusive) or the timeout expires
pub async fn collect_events_until<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    stop_predicate: F,
) -> Vec<Event>
where
    F: Fn(&Event) -> bool,
{
    let mut collected = Vec::new();

    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let stop = stop_predicate(&event);
            collected.push(event);
            if stop {
                break;
            }
        }
    })
    .await;

    collected
}

/// Number of `CycleCompleted` events in `events`
pub fn completed_cycles(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::CycleCompleted { .. }))
        .count()
}
