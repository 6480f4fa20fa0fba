//! Core entity and aggregate traits.

use serde::Serialize;

/// Trait for domain entities.
///
/// An entity's equality is defined solely by its identity: two entities
/// with the same id are the same entity regardless of their other
/// attributes. Implementors derive nothing here — they implement
/// `PartialEq`/`Eq`/`Hash` by comparing ids only, and the identity is
/// immutable once constructed.
pub trait Entity {
    /// The identifier type for this entity.
    type Id: Copy + Eq + std::hash::Hash + std::fmt::Display;

    /// Returns the entity's unique identifier.
    fn id(&self) -> Self::Id;
}

/// Trait for domain events.
///
/// Domain events are facts about state changes, named in past tense. They
/// are buffered on their aggregate until successfully dispatched after a
/// commit.
pub trait DomainEvent: Serialize + Send + Sync + Clone {
    /// Returns the event type name, used for routing and logging.
    fn event_type(&self) -> &'static str;
}

/// Append-only buffer of pending domain events, owned by an aggregate.
///
/// The buffer reflects changes not yet published. It is only ever emptied
/// by an explicit [`clear`](DomainEvents::clear) or
/// [`take`](DomainEvents::take) after the events have been durably
/// dispatched — never implicitly, and never on a failed commit.
#[derive(Debug, Clone, Default)]
pub struct DomainEvents<E> {
    pending: Vec<E>,
}

impl<E> DomainEvents<E> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Appends an event to the buffer.
    pub fn raise(&mut self, event: E) {
        self.pending.push(event);
    }

    /// Returns the pending events in the order they were raised.
    pub fn pending(&self) -> &[E] {
        &self.pending
    }

    /// Empties the buffer.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Drains the buffer, returning the events in raise order.
    pub fn take(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
    }

    /// Returns true if no events are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the number of pending events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Trait for aggregate roots.
///
/// An aggregate root is the consistency boundary for a cluster of related
/// data and the sole point through which domain events for that cluster
/// are raised. The calling command handler drains and dispatches events
/// only after a successful commit; if the commit fails, pending events
/// stay on the aggregate so a retried operation re-dispatches them
/// consistently.
pub trait AggregateRoot: Entity {
    /// The type of events this aggregate raises.
    type Event: DomainEvent;

    /// Returns the events raised since the last drain, in raise order.
    fn pending_events(&self) -> &[Self::Event];

    /// Empties the pending-event buffer.
    fn clear_domain_events(&mut self);

    /// Drains the pending-event buffer, returning the events in raise order.
    fn take_domain_events(&mut self) -> Vec<Self::Event>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Clone, Serialize, PartialEq)]
    struct Happened(u32);

    impl DomainEvent for Happened {
        fn event_type(&self) -> &'static str {
            "Happened"
        }
    }

    #[test]
    fn buffer_preserves_raise_order() {
        let mut events = DomainEvents::new();
        events.raise(Happened(1));
        events.raise(Happened(2));
        events.raise(Happened(3));

        assert_eq!(events.pending(), &[Happened(1), Happened(2), Happened(3)]);
    }

    #[test]
    fn take_drains_in_order_and_empties() {
        let mut events = DomainEvents::new();
        events.raise(Happened(1));
        events.raise(Happened(2));

        let drained = events.take();
        assert_eq!(drained, vec![Happened(1), Happened(2)]);
        assert!(events.is_empty());
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut events = DomainEvents::new();
        events.raise(Happened(1));
        assert_eq!(events.len(), 1);

        events.clear();
        assert!(events.is_empty());
    }
}
