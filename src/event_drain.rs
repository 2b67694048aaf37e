//! Draining iterator over a state machine's pending events.

use std::collections::vec_deque::Drain;
use std::iter::FusedIterator;

/// An opaque iterator that removes queued events in the order they were raised.
///
/// Returned by [`FireEngine::events`](crate::FireEngine::events),
/// [`TaskChain::events`](crate::TaskChain::events) and
/// [`ArsonRound::events`](crate::ArsonRound::events). Events not consumed before the
/// iterator is dropped are discarded.
///
/// # Examples
///
/// ```
/// use arson_mode::{FireEngine, FireEvent, RoomGraph, RoomId};
///
/// let graph = RoomGraph::build([("Kitchen", "Lobby")]);
/// let mut engine = FireEngine::new(graph, Default::default());
/// engine.ignite(&RoomId::from("Kitchen"));
///
/// for event in engine.events() {
///     if let FireEvent::RoomIgnited { room, .. } = event {
///         assert_eq!(room.as_str(), "Kitchen");
///     }
/// }
/// assert_eq!(engine.events().len(), 0);
/// ```
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct EventDrain<'a, T> {
    inner: Drain<'a, T>,
}

impl<'a, T> EventDrain<'a, T> {
    pub(crate) fn from_drain(drain: Drain<'a, T>) -> Self {
        Self { inner: drain }
    }
}

impl<T> Iterator for EventDrain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for EventDrain<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for EventDrain<'_, T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<T> FusedIterator for EventDrain<'_, T> {}

impl<T> std::fmt::Debug for EventDrain<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDrain")
            .field("remaining", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn queue_of(values: &[u8]) -> VecDeque<u8> {
        values.iter().copied().collect()
    }

    #[test]
    fn yields_in_fifo_order_and_empties_queue() {
        let mut queue = queue_of(&[1, 2, 3]);
        let drained: Vec<_> = EventDrain::from_drain(queue.drain(..)).collect();
        assert_eq!(drained, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn dropping_early_discards_the_rest() {
        let mut queue = queue_of(&[1, 2, 3]);
        {
            let mut drain = EventDrain::from_drain(queue.drain(..));
            assert_eq!(drain.next(), Some(1));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn exact_size_tracks_consumption() {
        let mut queue = queue_of(&[4, 5]);
        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(drain.len(), 2);
        assert_eq!(drain.next_back(), Some(5));
        assert_eq!(drain.len(), 1);
        assert_eq!(format!("{drain:?}"), "EventDrain { remaining: 1 }");
    }
}
