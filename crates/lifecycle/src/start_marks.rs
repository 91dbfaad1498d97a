//! Terminals whose agent launch is pending.
//!
//! Other code paths consult this set so they do not treat a terminal that is
//! being restarted as one that still needs a launch.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use studio_core::TerminalId;

#[derive(Debug, Clone, Default)]
pub struct TerminalStartMarks {
    ids: Arc<Mutex<HashSet<TerminalId>>>,
}

impl TerminalStartMarks {
    pub fn new() -> Self {
        Self::default()
    }

    fn ids(&self) -> MutexGuard<'_, HashSet<TerminalId>> {
        self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns false if the terminal was already marked.
    pub fn mark(&self, terminal_id: &str) -> bool {
        self.ids().insert(terminal_id.to_string())
    }

    /// Called by whoever confirms the terminal is running.
    pub fn clear(&self, terminal_id: &str) -> bool {
        self.ids().remove(terminal_id)
    }

    pub fn is_starting(&self, terminal_id: &str) -> bool {
        self.ids().contains(terminal_id)
    }

    pub fn snapshot(&self) -> Vec<TerminalId> {
        let mut ids: Vec<_> = self.ids().iter().cloned().collect();
        ids.sort();
        ids
    }
}
