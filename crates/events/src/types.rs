//! Event types for the studio UI event bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct EventEnvelope {
    /// Unique event ID
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub id: Uuid,
    /// When the event occurred
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// All possible events in the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Project events
    /// A project finished initializing and became active
    #[serde(rename = "project.opened")]
    ProjectOpened { path: String, name: String },

    /// The host rejected a project initialization
    #[serde(rename = "project.open_failed")]
    ProjectOpenFailed { path: String, error: String },

    /// A project tab was closed
    #[serde(rename = "project.closed")]
    ProjectClosed {
        path: String,
        next_active_path: Option<String>,
    },

    // Terminal events
    /// The focused terminal was rebound to a fresh agent
    #[serde(rename = "terminal.reset")]
    TerminalReset { detail: TerminalResetDetail },

    // System events
    /// Generic error event
    #[serde(rename = "error")]
    Error {
        message: String,
        context: Option<String>,
    },
}

/// Which pane a terminal reset applied to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminalResetDetail {
    Orchestrator,
    Session { session_id: String },
}

impl Event {
    /// Get the project path associated with this event, if any
    pub fn project_path(&self) -> Option<&str> {
        match self {
            Event::ProjectOpened { path, .. } => Some(path),
            Event::ProjectOpenFailed { path, .. } => Some(path),
            Event::ProjectClosed { path, .. } => Some(path),
            Event::TerminalReset { .. } => None,
            Event::Error { .. } => None,
        }
    }
}
