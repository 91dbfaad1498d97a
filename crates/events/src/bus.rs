//! UI event bus implementation using tokio broadcast channels

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::types::{Event, EventEnvelope};

const DEFAULT_CAPACITY: usize = 256;

struct BusInner {
    sender: broadcast::Sender<EventEnvelope>,
    published: AtomicUsize,
    /// Published while nobody was subscribed.
    unobserved: AtomicUsize,
}

/// Fire-and-forget bus for events consumed by rendering layers.
///
/// Publishing never blocks and never fails. With nobody listening the event
/// is dropped and only counted; a subscriber that falls more than the channel
/// capacity behind sees `RecvError::Lagged` and skips ahead.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(BusInner {
                sender,
                published: AtomicUsize::new(0),
                unobserved: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns how many subscribers the envelope reached.
    pub fn publish(&self, envelope: EventEnvelope) -> usize {
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(event = ?envelope.event, "publishing ui event");

        match self.inner.sender.send(envelope) {
            Ok(receivers) => receivers,
            Err(_) => {
                self.inner.unobserved.fetch_add(1, Ordering::Relaxed);
                0
            }
        }
    }

    pub fn emit(&self, event: Event) -> usize {
        self.publish(EventEnvelope::new(event))
    }

    /// Only events published after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.inner.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }

    /// Total events published, observed or not.
    pub fn event_count(&self) -> usize {
        self.inner.published.load(Ordering::Relaxed)
    }

    pub fn unobserved_count(&self) -> usize {
        self.inner.unobserved.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("published", &self.event_count())
            .field("unobserved", &self.unobserved_count())
            .finish()
    }
}
