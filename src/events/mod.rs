use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::models::{ConnectionEvent, DisplayedClocks, GameOver, TimeoutEvent};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Slots<E> {
    next_id: u64,
    handlers: Vec<(u64, Callback<E>)>,
}

/// Subscribers for one event type
pub struct Channel<E> {
    slots: Arc<Mutex<Slots<E>>>,
}

impl<E: 'static> Channel<E> {
    pub fn new() -> Self {
        Channel {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    /// Register a handler. It stays registered until the returned
    /// `Subscription` is dropped or disposed.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            let id = slots.next_id;
            slots.next_id += 1;
            slots.handlers.push((id, Arc::new(handler)));
            id
        };

        let slots: Weak<Mutex<Slots<E>>> = Arc::downgrade(&self.slots);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(slots) = slots.upgrade() {
                    let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
                    slots.handlers.retain(|(handler_id, _)| *handler_id != id);
                }
            })),
        }
    }

    /// Deliver an event to every current handler; returns how many ran
    pub fn emit(&self, event: &E) -> usize {
        // Handlers run outside the lock so they may subscribe or dispose
        let handlers: Vec<Callback<E>> = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.handlers.iter().map(|(_, handler)| handler.clone()).collect()
        };

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .len()
    }
}

impl<E: 'static> Default for Channel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Channel<E> {
    fn clone(&self) -> Self {
        Channel {
            slots: self.slots.clone(),
        }
    }
}

/// Disposer returned by `Channel::subscribe`
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Every event the client surfaces to the UI, one typed channel each
#[derive(Clone, Default)]
pub struct EventBus {
    pub clocks: Channel<DisplayedClocks>,
    /// Advisory local flag fall; the server still rules on it
    pub timeout: Channel<TimeoutEvent>,
    pub game_over: Channel<GameOver>,
    pub connection: Channel<ConnectionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delivers_until_disposed() {
        let channel: Channel<u32> = Channel::new();
        let total = Arc::new(AtomicUsize::new(0));

        let seen = total.clone();
        let subscription = channel.subscribe(move |value| {
            seen.fetch_add(*value as usize, Ordering::SeqCst);
        });

        assert_eq!(channel.emit(&2), 1);
        assert_eq!(channel.emit(&3), 1);
        subscription.dispose();
        assert_eq!(channel.emit(&100), 0);

        assert_eq!(total.load(Ordering::SeqCst), 5);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn dropping_the_subscription_unsubscribes() {
        let channel: Channel<()> = Channel::new();
        {
            let _first = channel.subscribe(|_| {});
            let _second = channel.subscribe(|_| {});
            assert_eq!(channel.subscriber_count(), 2);
        }
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn only_the_disposed_handler_is_removed() {
        let channel: Channel<()> = Channel::new();
        let first = channel.subscribe(|_| {});
        let _second = channel.subscribe(|_| {});

        first.dispose();
        assert_eq!(channel.emit(&()), 1);
    }

    #[test]
    fn handlers_may_subscribe_while_emitting() {
        let channel: Channel<()> = Channel::new();
        let inner = channel.clone();
        let held = Arc::new(Mutex::new(Vec::new()));

        let keep = held.clone();
        let _outer = channel.subscribe(move |_| {
            let sub = inner.subscribe(|_| {});
            keep.lock().unwrap().push(sub);
        });

        assert_eq!(channel.emit(&()), 1);
        assert_eq!(channel.subscriber_count(), 2);
    }

    #[test]
    fn disposing_after_bus_is_gone_is_harmless() {
        let subscription = {
            let bus = EventBus::new();
            bus.timeout.subscribe(|_| {})
        };
        subscription.dispose();
    }
}
