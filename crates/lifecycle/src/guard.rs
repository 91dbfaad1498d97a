//! RAII in-flight guard for terminal reset sequences.
//!
//! One guard is shared by every multi-step operation on a
//! [`SessionCoordinator`](crate::SessionCoordinator); while a token is alive
//! any further attempt to acquire it fails immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

/// Shared in-flight flag.
///
/// # Example
///
/// ```ignore
/// let guard = ResetGuard::new();
/// let Some(_token) = guard.try_acquire() else {
///     return Ok(ResetOutcome::Skipped);
/// };
/// // ... run the sequence ...
/// // the flag is cleared when `_token` drops, on success or error alike
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResetGuard {
    in_flight: Arc<AtomicBool>,
}

impl ResetGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard if it is free.
    pub fn try_acquire(&self) -> Option<ResetGuardToken> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        debug!("Reset guard acquired");
        Some(ResetGuardToken {
            in_flight: Arc::clone(&self.in_flight),
            acquired_at: Instant::now(),
        })
    }

    pub fn is_held(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Proof of holding the [`ResetGuard`]; releases it on drop.
#[derive(Debug)]
pub struct ResetGuardToken {
    in_flight: Arc<AtomicBool>,
    acquired_at: Instant,
}

impl Drop for ResetGuardToken {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
        debug!(
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "Reset guard released"
        );
    }
}
