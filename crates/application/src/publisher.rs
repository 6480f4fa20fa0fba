//! Post-commit event dispatch.
//!
//! Event buffering (on the aggregate) and event delivery (here) are two
//! separate concerns connected only by an explicit drain: the handler
//! calls [`dispatch_pending`] after — and only after — a successful
//! commit. If the commit failed, the events stay on the aggregate; if
//! delivery fails partway, the buffer also stays intact so a retried
//! operation re-dispatches consistently.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use domain::{AggregateRoot, DomainEvent, Failure, OpResult};

/// A domain event flattened for delivery to an external dispatcher.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// The event type name (e.g. `"CustomerCreated"`).
    pub event_type: &'static str,

    /// When the event was handed to the publisher.
    pub occurred_at: DateTime<Utc>,

    /// The serialized event payload.
    pub payload: serde_json::Value,
}

/// External seam for delivering domain events after a commit.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Delivers one event. An error means delivery was not accepted and
    /// the event must not be considered dispatched.
    async fn publish(&self, event: EventRecord) -> OpResult<()>;
}

/// Drains an aggregate's pending events into the publisher.
///
/// Events go out in raise order. The buffer is cleared only once every
/// event was accepted; a delivery failure leaves it untouched.
pub async fn dispatch_pending<A, P>(aggregate: &mut A, publisher: &P) -> OpResult<()>
where
    A: AggregateRoot,
    P: EventPublisher + ?Sized,
{
    for event in aggregate.pending_events() {
        let payload = serde_json::to_value(event)
            .map_err(|e| Failure::unexpected(format!("failed to serialize domain event: {e}")))?;
        publisher
            .publish(EventRecord {
                event_type: event.event_type(),
                occurred_at: Utc::now(),
                payload,
            })
            .await?;
    }
    aggregate.clear_domain_events();
    Ok(())
}

/// Publisher that emits events to the tracing pipeline. Stands in for a
/// real broker in the thin wiring binary.
#[derive(Debug, Default, Clone)]
pub struct TracingPublisher;

#[async_trait]
impl EventPublisher for TracingPublisher {
    async fn publish(&self, event: EventRecord) -> OpResult<()> {
        tracing::info!(
            event_type = event.event_type,
            payload = %event.payload,
            "domain event published"
        );
        Ok(())
    }
}

/// Publisher that records events in memory, for tests.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<EventRecord>>,
    fail_next: Mutex<bool>,
}

impl RecordingPublisher {
    /// Creates an empty recording publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events in publish order.
    pub async fn events(&self) -> Vec<EventRecord> {
        self.events.lock().await.clone()
    }

    /// Makes the next publish call fail.
    pub async fn fail_next(&self) {
        *self.fail_next.lock().await = true;
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: EventRecord) -> OpResult<()> {
        let mut fail = self.fail_next.lock().await;
        if *fail {
            *fail = false;
            return Err(Failure::transient("event broker unavailable"));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}
