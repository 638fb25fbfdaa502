//! Touch input hub.
//!
//! The platform side pushes raw [`TouchEvent`]s into a [`TouchInput`]; each
//! live [`TouchSubscription`] receives every event, in order, from the moment
//! it subscribed. Dropping the subscription detaches it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::gesture::TouchEvent;

type Queue = Rc<RefCell<VecDeque<TouchEvent>>>;

#[derive(Default)]
pub struct TouchInput {
    subscribers: RefCell<Vec<Weak<RefCell<VecDeque<TouchEvent>>>>>,
}

impl TouchInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> TouchSubscription {
        let queue: Queue = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers.borrow_mut().push(Rc::downgrade(&queue));
        TouchSubscription { queue }
    }

    /// Deliver to every live subscriber. Returns how many received it.
    pub fn dispatch(&self, event: TouchEvent) -> usize {
        let mut subs = self.subscribers.borrow_mut();
        subs.retain(|w| w.strong_count() > 0);
        for sub in subs.iter().filter_map(Weak::upgrade) {
            sub.borrow_mut().push_back(event.clone());
        }
        trace!(phase = ?event.phase, receivers = subs.len(), "touch dispatched");
        subs.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().iter().filter(|w| w.strong_count() > 0).count()
    }
}

/// Receiving end of a [`TouchInput`]. Not `Send`: input stays on the UI thread.
pub struct TouchSubscription {
    queue: Queue,
}

impl TouchSubscription {
    /// Next pending event, oldest first.
    pub fn next_event(&self) -> Option<TouchEvent> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_order() {
        let input = TouchInput::new();
        let sub = input.subscribe();
        input.dispatch(TouchEvent::start(&[(1.0, 1.0)]));
        input.dispatch(TouchEvent::moved(&[(2.0, 1.0)]));
        input.dispatch(TouchEvent::end(&[]));

        assert_eq!(sub.pending(), 3);
        assert_eq!(sub.next_event().unwrap(), TouchEvent::start(&[(1.0, 1.0)]));
        assert_eq!(sub.next_event().unwrap(), TouchEvent::moved(&[(2.0, 1.0)]));
        assert_eq!(sub.next_event().unwrap(), TouchEvent::end(&[]));
        assert!(sub.next_event().is_none());
    }

    #[test]
    fn dropping_subscription_detaches() {
        let input = TouchInput::new();
        let a = input.subscribe();
        let b = input.subscribe();
        assert_eq!(input.subscriber_count(), 2);

        drop(a);
        assert_eq!(input.dispatch(TouchEvent::start(&[(0.0, 0.0)])), 1);
        assert_eq!(b.pending(), 1);

        drop(b);
        assert_eq!(input.dispatch(TouchEvent::end(&[])), 0);
        assert_eq!(input.subscriber_count(), 0);
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let input = TouchInput::new();
        input.dispatch(TouchEvent::start(&[(0.0, 0.0)]));
        let sub = input.subscribe();
        assert!(sub.next_event().is_none());
    }
}
