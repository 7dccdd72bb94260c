//! Publish/subscribe event channel.
//!
//! [`EventChannel`] is a cloneable handle over a shared registry of
//! subscribers, keyed by [`Channel`]. Producers (a hardware polling thread,
//! the replay worker) call [`EventChannel::emit`]; each subscriber registered
//! for that channel receives the event in subscription order.
//!
//! Delivery runs under the registry lock, which has two consequences callers
//! rely on:
//! - delivery is serialized: subscriber callbacks never run concurrently
//!   with each other, so an [`EventSink`] needs `Send` but not `Sync`;
//! - [`EventChannel::unsubscribe`] is a barrier: once it returns, the removed
//!   sink will not see another event, even one already in flight on a
//!   producer thread.
//!
//! A sink must not call back into the channel it is subscribed to from
//! inside [`EventSink::on_event`]; the registry lock is not reentrant.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::event::{Channel, Event};

/// Trait for reacting to events delivered on a channel.
pub trait EventSink: Send {
    fn on_event(&mut self, event: &Event);
}

/// Handle returned by [`EventChannel::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Entry {
    channel: Channel,
    sink: Box<dyn EventSink>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    // BTreeMap + monotonic ids keeps delivery in subscription order.
    entries: BTreeMap<u64, Entry>,
}

/// Cloneable handle to a shared subscriber registry.
#[derive(Clone, Default)]
pub struct EventChannel {
    registry: Arc<Mutex<Registry>>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink for one channel and returns its handle.
    pub fn subscribe(&self, channel: Channel, sink: impl EventSink + 'static) -> SubscriberId {
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.insert(
            id,
            Entry {
                channel,
                sink: Box::new(sink),
            },
        );
        SubscriberId(id)
    }

    /// Removes a subscriber. Returns `false` if the id was already gone.
    ///
    /// Blocks until any in-flight delivery has finished, so the removed sink
    /// is guaranteed to see no further events once this returns.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.lock().entries.remove(&id.0).is_some()
    }

    /// Delivers one event to every sink subscribed to `channel`.
    pub fn emit(&self, channel: Channel, event: &Event) {
        let mut registry = self.lock();
        for entry in registry.entries.values_mut() {
            if entry.channel == channel {
                entry.sink.on_event(event);
            }
        }
    }

    /// Number of live subscriptions, across both channels.
    pub fn subscriber_count(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Adapter turning a closure into an [`EventSink`].
pub struct SinkFn<F>(F);

/// Wraps a closure for subscription: `bus.subscribe(ch, sink_fn(|e| ...))`.
pub fn sink_fn<F>(f: F) -> SinkFn<F>
where
    F: FnMut(&Event) + Send,
{
    SinkFn(f)
}

impl<F> EventSink for SinkFn<F>
where
    F: FnMut(&Event) + Send,
{
    fn on_event(&mut self, event: &Event) {
        (self.0)(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::event::Event;

    fn counter_sink(hits: &Arc<AtomicUsize>) -> impl EventSink {
        let hits = Arc::clone(hits);
        sink_fn(move |_: &Event| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn emit_reaches_only_the_matching_channel() {
        let bus = EventChannel::new();
        let keyboard_hits = Arc::new(AtomicUsize::new(0));
        let joystick_hits = Arc::new(AtomicUsize::new(0));
        bus.subscribe(Channel::Keyboard, counter_sink(&keyboard_hits));
        bus.subscribe(Channel::Joystick, counter_sink(&joystick_hits));

        bus.emit(Channel::Joystick, &Event::button_edge(1, 0, true));
        assert_eq!(keyboard_hits.load(Ordering::SeqCst), 0);
        assert_eq!(joystick_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribed_sink_sees_nothing() {
        let bus = EventChannel::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = bus.subscribe(Channel::Keyboard, counter_sink(&hits));

        bus.emit(Channel::Keyboard, &Event::key_edge(0, 30, true));
        assert!(bus.unsubscribe(id));
        bus.emit(Channel::Keyboard, &Event::key_edge(0, 30, false));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn delivery_follows_subscription_order() {
        let bus = EventChannel::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe(
                Channel::Joystick,
                sink_fn(move |_: &Event| {
                    order.lock().unwrap().push(label);
                }),
            );
        }

        bus.emit(Channel::Joystick, &Event::button_edge(1, 1, true));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }
}
