//! FIFO queue for project switch requests.
//!
//! Requests are serviced one at a time in submission order. A request for a
//! key that is already queued or in flight shares that request's outcome
//! instead of being serviced again.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{LifecycleError, Result};

/// Shared outcome of one queued switch.
pub type SwitchHandle = Shared<BoxFuture<'static, Result<()>>>;

#[derive(Default)]
struct QueueState {
    pending: HashMap<String, SwitchHandle>,
    /// Fires once the most recently submitted request has settled.
    tail: Option<oneshot::Receiver<()>>,
}

#[derive(Clone, Default)]
pub struct SwitchQueue {
    state: Arc<Mutex<QueueState>>,
}

impl SwitchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue `service` under `key`, or attach to the request already pending
    /// for that key.
    ///
    /// The service is spawned immediately and runs to completion even if every
    /// handle is dropped. Must be called from within a tokio runtime.
    pub fn submit<F, Fut>(&self, key: &str, service: F) -> SwitchHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut state = self.state();
        if let Some(existing) = state.pending.get(key) {
            debug!(path = %key, "Switch already pending, attaching");
            return existing.clone();
        }

        let (done_tx, done_rx) = oneshot::channel();
        let previous = state.tail.replace(done_rx);
        let queue = self.clone();
        let owned_key = key.to_string();

        let task = tokio::spawn(async move {
            // Settles the slot even if `service` panics.
            let _settle = SettleOnDrop {
                queue,
                key: owned_key,
                done: Some(done_tx),
            };
            if let Some(previous) = previous {
                // Err only means the previous request's task is gone.
                let _ = previous.await;
            }
            service().await
        });

        let interrupted_key = key.to_string();
        let handle = task
            .map(move |joined| {
                joined.unwrap_or_else(|err| {
                    Err(LifecycleError::SwitchInterrupted {
                        path: interrupted_key,
                        reason: err.to_string(),
                    })
                })
            })
            .boxed()
            .shared();

        state.pending.insert(key.to_string(), handle.clone());
        handle
    }

    /// Whether a request for `key` is queued or in flight.
    pub fn is_pending(&self, key: &str) -> bool {
        self.state().pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }
}

/// Frees the pending slot for `key` and wakes the next request.
struct SettleOnDrop {
    queue: SwitchQueue,
    key: String,
    done: Option<oneshot::Sender<()>>,
}

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        self.queue.state().pending.remove(&self.key);
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

impl std::fmt::Debug for SwitchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchQueue")
            .field("pending", &self.pending_count())
            .finish()
    }
}
