use std::collections::vec_deque::Drain;
use std::iter::FusedIterator;

use crate::GameEvent;

/// A zero-allocation opaque iterator that drains events from a client.
///
/// This type wraps the internal event queue drain, providing a stable public API
/// that doesn't expose `std::collections::vec_deque::Drain` directly. It implements
/// [`Iterator`], [`DoubleEndedIterator`], [`ExactSizeIterator`], and [`FusedIterator`].
///
/// Obtain an `EventDrain` by calling [`GameClient::events()`].
///
/// # Examples
///
/// ```ignore
/// for event in client.events() {
///     match event {
///         GameEvent::Tick { snapshot, .. } => {
///             println!("Clock now shows {snapshot}");
///         }
///         _ => { /* handle other events */ }
///     }
/// }
/// ```
///
/// [`GameClient::events()`]: crate::GameClient::events
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct EventDrain<'a> {
    inner: EventDrainInner<'a>,
}

enum EventDrainInner<'a> {
    Queue(Drain<'a, GameEvent>),
    #[allow(dead_code)]
    Empty,
}

impl<'a> EventDrain<'a> {
    pub(crate) fn from_drain(drain: Drain<'a, GameEvent>) -> Self {
        Self {
            inner: EventDrainInner::Queue(drain),
        }
    }

    #[allow(dead_code)]
    pub(crate) fn empty() -> Self {
        Self {
            inner: EventDrainInner::Empty,
        }
    }
}

impl Iterator for EventDrain<'_> {
    type Item = GameEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            EventDrainInner::Queue(drain) => drain.next(),
            EventDrainInner::Empty => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            EventDrainInner::Queue(drain) => drain.size_hint(),
            EventDrainInner::Empty => (0, Some(0)),
        }
    }
}

impl DoubleEndedIterator for EventDrain<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            EventDrainInner::Queue(drain) => drain.next_back(),
            EventDrainInner::Empty => None,
        }
    }
}

impl ExactSizeIterator for EventDrain<'_> {
    fn len(&self) -> usize {
        match &self.inner {
            EventDrainInner::Queue(drain) => drain.len(),
            EventDrainInner::Empty => 0,
        }
    }
}

impl FusedIterator for EventDrain<'_> {}

impl std::fmt::Debug for EventDrain<'_> {
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
    clippy::indexing_slicing,
    clippy::iter_with_drain
)]
mod tests {
    use super::*;
    use crate::SessionHandle;
    use std::collections::VecDeque;

    fn expiries(handles: &[u64]) -> VecDeque<GameEvent> {
        handles
            .iter()
            .map(|&handle| GameEvent::Expired {
                handle: SessionHandle::new(handle),
            })
            .collect()
    }

    #[test]
    fn an_empty_drain_yields_nothing() {
        let mut drain = EventDrain::empty();
        assert_eq!(drain.len(), 0);
        assert_eq!(drain.size_hint(), (0, Some(0)));
        assert!(drain.next().is_none());
    }

    #[test]
    fn events_come_out_in_queue_order() {
        let mut queue = expiries(&[1, 2, 3]);
        let handles: Vec<u64> = EventDrain::from_drain(queue.drain(..))
            .map(|event| match event {
                GameEvent::Expired { handle } => handle.as_u64(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(handles, [1, 2, 3]);
    }

    #[test]
    fn the_drain_is_fused_after_exhaustion() {
        let mut queue = expiries(&[1]);
        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert!(drain.next().is_some());
        assert!(drain.next().is_none());
        assert!(drain.next().is_none());
    }

    #[test]
    fn both_ends_and_len_agree() {
        let mut queue = expiries(&[1, 2, 3]);
        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(drain.len(), 3);
        assert_eq!(drain.size_hint(), (3, Some(3)));

        let last = drain.next_back();
        let first = drain.next();
        assert_eq!(drain.len(), 1);
        assert!(matches!(last, Some(GameEvent::Expired { handle }) if handle.as_u64() == 3));
        assert!(matches!(first, Some(GameEvent::Expired { handle }) if handle.as_u64() == 1));
    }

    #[test]
    fn debug_shows_how_many_events_remain() {
        let mut queue = expiries(&[1, 2]);
        let drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(format!("{drain:?}"), "EventDrain { remaining: 2 }");
        assert_eq!(
            format!("{:?}", EventDrain::empty()),
            "EventDrain { remaining: 0 }"
        );
    }
}
