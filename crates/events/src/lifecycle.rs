//! Host lifecycle signals keyed by terminal id.
//!
//! Every subscription gets its own unbounded queue, filled at publish time
//! with signals of its kind only. A slow waiter therefore never loses its
//! signal to a burst of unrelated ones. Subscriptions unregister themselves
//! when dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use studio_core::{LifecycleEvent, LifecycleEventKind};
use tokio::sync::mpsc;
use tracing::trace;

struct Subscriber {
    kind: LifecycleEventKind,
    sender: mpsc::UnboundedSender<LifecycleEvent>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Subscribe-by-name pub/sub for host lifecycle signals.
///
/// Clones share one registry. Once every clone is dropped, pending
/// subscriptions observe the end of the stream.
#[derive(Clone, Default)]
pub struct LifecycleBus {
    registry: Arc<Mutex<Registry>>,
}

impl LifecycleBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a host signal to every live subscription of its kind.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        let kind = event.kind();
        trace!(
            kind = kind.as_str(),
            terminal_id = %event.terminal_id(),
            "lifecycle signal"
        );

        lock(&self.registry)
            .subscribers
            .values()
            .filter(|s| s.kind == kind)
            .filter(|s| s.sender.send(event.clone()).is_ok())
            .count()
    }

    /// Start listening for `kind`. Only signals published after this call
    /// are observed.
    pub fn subscribe(&self, kind: LifecycleEventKind) -> LifecycleSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.subscribers.insert(id, Subscriber { kind, sender });
            id
        };

        LifecycleSubscription {
            id,
            kind,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Live subscriptions for `kind`.
    pub fn listener_count(&self, kind: LifecycleEventKind) -> usize {
        lock(&self.registry)
            .subscribers
            .values()
            .filter(|s| s.kind == kind)
            .count()
    }
}

impl std::fmt::Debug for LifecycleBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleBus")
            .field(
                "terminal_closed",
                &self.listener_count(LifecycleEventKind::TerminalClosed),
            )
            .field(
                "terminal_agent_started",
                &self.listener_count(LifecycleEventKind::TerminalAgentStarted),
            )
            .finish()
    }
}

/// A live registration for one event kind.
pub struct LifecycleSubscription {
    id: u64,
    kind: LifecycleEventKind,
    receiver: mpsc::UnboundedReceiver<LifecycleEvent>,
    registry: Weak<Mutex<Registry>>,
}

impl LifecycleSubscription {
    pub fn kind(&self) -> LifecycleEventKind {
        self.kind
    }

    /// Next signal of this subscription's kind.
    ///
    /// Returns `None` once every bus handle has been dropped and the queued
    /// signals are drained.
    pub async fn recv(&mut self) -> Option<LifecycleEvent> {
        self.receiver.recv().await
    }

    /// Next signal of this kind for `terminal_id`; others are skipped.
    pub async fn recv_for(&mut self, terminal_id: &str) -> Option<LifecycleEvent> {
        loop {
            let event = self.recv().await?;
            if event.terminal_id() == terminal_id {
                return Some(event);
            }
        }
    }
}

impl Drop for LifecycleSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscribers.remove(&self.id);
        }
    }
}
