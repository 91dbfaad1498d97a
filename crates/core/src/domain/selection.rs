use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Identifier of a pseudo-terminal owned by the host process.
pub type TerminalId = String;

/// What the focused pane is bound to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Selection {
    Orchestrator,
    Session(String),
}

impl Selection {
    pub fn session(session_id: impl Into<String>) -> Self {
        Self::Session(session_id.into())
    }

    pub fn is_orchestrator(&self) -> bool {
        matches!(self, Self::Orchestrator)
    }

    /// The session id, if this is a session selection with a usable payload.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Session(id) if !id.trim().is_empty() => Some(id.as_str()),
            _ => None,
        }
    }

    /// True for a session selection whose payload is empty or blank.
    pub fn has_invalid_payload(&self) -> bool {
        matches!(self, Self::Session(_)) && self.session_id().is_none()
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orchestrator => f.write_str("orchestrator"),
            Self::Session(id) => write!(f, "session:{}", id),
        }
    }
}

/// Top and bottom terminals bound to one selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TerminalPair {
    pub top: TerminalId,
    pub bottom_base: TerminalId,
}

impl TerminalPair {
    pub fn new(top: impl Into<TerminalId>, bottom_base: impl Into<TerminalId>) -> Self {
        Self {
            top: top.into(),
            bottom_base: bottom_base.into(),
        }
    }
}

/// Name of the agent binary driving a terminal (`claude`, `codex`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct AgentType(String);

impl AgentType {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation(
                "agent type must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
