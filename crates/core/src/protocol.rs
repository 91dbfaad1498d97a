//! Wire types exchanged with the host process.
//!
//! Commands go out over the request/response channel, lifecycle events come
//! back over the signal stream.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::{AgentType, TerminalId};

/// A request issued to the host process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum HostCommand {
    InitializeProject {
        path: String,
    },
    AddRecentProject {
        path: String,
    },
    CloseProject {
        path: String,
    },
    ResetOrchestrator {
        terminal_id: TerminalId,
    },
    TerminalExists {
        terminal_id: TerminalId,
    },
    CloseTerminal {
        terminal_id: TerminalId,
    },
    StartSessionAgentWithRestart {
        session_name: String,
        force_restart: bool,
    },
    StartClaudeOrchestrator {
        terminal_id: TerminalId,
        force_restart: bool,
    },
    SetSkipPermissions {
        enabled: bool,
    },
    SetAgentType {
        agent_type: AgentType,
    },
}

impl HostCommand {
    /// Command name as understood by the host.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitializeProject { .. } => "initialize_project",
            Self::AddRecentProject { .. } => "add_recent_project",
            Self::CloseProject { .. } => "close_project",
            Self::ResetOrchestrator { .. } => "reset_orchestrator",
            Self::TerminalExists { .. } => "terminal_exists",
            Self::CloseTerminal { .. } => "close_terminal",
            Self::StartSessionAgentWithRestart { .. } => "start_session_agent_with_restart",
            Self::StartClaudeOrchestrator { .. } => "start_claude_orchestrator",
            Self::SetSkipPermissions { .. } => "set_skip_permissions",
            Self::SetAgentType { .. } => "set_agent_type",
        }
    }

    /// Arguments object sent as the request body.
    pub fn args(&self) -> Value {
        match self {
            Self::InitializeProject { path }
            | Self::AddRecentProject { path }
            | Self::CloseProject { path } => json!({ "path": path }),
            Self::ResetOrchestrator { terminal_id }
            | Self::TerminalExists { terminal_id }
            | Self::CloseTerminal { terminal_id } => json!({ "terminal_id": terminal_id }),
            Self::StartSessionAgentWithRestart {
                session_name,
                force_restart,
            } => json!({ "session_name": session_name, "force_restart": force_restart }),
            Self::StartClaudeOrchestrator {
                terminal_id,
                force_restart,
            } => json!({ "terminal_id": terminal_id, "force_restart": force_restart }),
            Self::SetSkipPermissions { enabled } => json!({ "enabled": enabled }),
            Self::SetAgentType { agent_type } => json!({ "agent_type": agent_type.as_str() }),
        }
    }
}

/// Names under which lifecycle signals are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    TerminalClosed,
    TerminalAgentStarted,
}

impl LifecycleEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TerminalClosed => "terminal-closed",
            Self::TerminalAgentStarted => "terminal-agent-started",
        }
    }
}

/// A signal emitted by the host about one terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    TerminalClosed {
        terminal_id: TerminalId,
    },
    TerminalAgentStarted {
        terminal_id: TerminalId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_name: Option<String>,
    },
}

impl LifecycleEvent {
    pub fn kind(&self) -> LifecycleEventKind {
        match self {
            Self::TerminalClosed { .. } => LifecycleEventKind::TerminalClosed,
            Self::TerminalAgentStarted { .. } => LifecycleEventKind::TerminalAgentStarted,
        }
    }

    pub fn terminal_id(&self) -> &str {
        match self {
            Self::TerminalClosed { terminal_id } => terminal_id,
            Self::TerminalAgentStarted { terminal_id, .. } => terminal_id,
        }
    }
}
