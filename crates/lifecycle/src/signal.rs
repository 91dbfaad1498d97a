//! One-shot wait for a host lifecycle signal on a specific terminal.

use events::{LifecycleBus, LifecycleSubscription};
use studio_core::{LifecycleEvent, LifecycleEventKind, TerminalId};
use tracing::debug;

use crate::error::{LifecycleError, Result};

/// A pending wait for one signal about one terminal.
///
/// The subscription is registered at construction, so create the signal
/// before issuing the command that triggers it. Dropping the signal, whether
/// it fired or not, unregisters it.
pub struct TerminalSignal {
    subscription: LifecycleSubscription,
    terminal_id: TerminalId,
}

impl TerminalSignal {
    pub fn new(bus: &LifecycleBus, kind: LifecycleEventKind, terminal_id: &str) -> Self {
        Self {
            subscription: bus.subscribe(kind),
            terminal_id: terminal_id.to_string(),
        }
    }

    pub fn closed(bus: &LifecycleBus, terminal_id: &str) -> Self {
        Self::new(bus, LifecycleEventKind::TerminalClosed, terminal_id)
    }

    pub fn agent_started(bus: &LifecycleBus, terminal_id: &str) -> Self {
        Self::new(bus, LifecycleEventKind::TerminalAgentStarted, terminal_id)
    }

    pub fn kind(&self) -> LifecycleEventKind {
        self.subscription.kind()
    }

    /// Wait, without a timeout, for the first matching signal.
    pub async fn wait(mut self) -> Result<LifecycleEvent> {
        let kind = self.kind();
        debug!(
            kind = kind.as_str(),
            terminal_id = %self.terminal_id,
            "Waiting for lifecycle signal"
        );

        match self.subscription.recv_for(&self.terminal_id).await {
            Some(event) => {
                debug!(
                    kind = kind.as_str(),
                    terminal_id = %self.terminal_id,
                    "Lifecycle signal received"
                );
                Ok(event)
            }
            None => Err(LifecycleError::EventStreamClosed {
                kind: kind.as_str(),
                terminal_id: self.terminal_id.clone(),
            }),
        }
    }
}
