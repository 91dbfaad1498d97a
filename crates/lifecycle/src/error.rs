use thiserror::Error;

/// Failure reported by the host for a single command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("{command} rejected by host: {message}")]
    Rejected { command: String, message: String },

    #[error("Host unreachable: {0}")]
    Transport(String),

    #[error("Unexpected response to {command}: {detail}")]
    InvalidResponse { command: String, detail: String },
}

impl CommandError {
    pub fn rejected(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            command: command.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Remote command failed: {0}")]
    Command(#[from] CommandError),

    #[error("Lifecycle stream closed while waiting for {kind} on {terminal_id}")]
    EventStreamClosed {
        kind: &'static str,
        terminal_id: String,
    },

    #[error("Switch to {path} was interrupted: {reason}")]
    SwitchInterrupted { path: String, reason: String },
}

/// How a failure should be presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Non-fatal notice; nothing was sent to the host.
    Advisory,
    Error,
}

impl LifecycleError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Validation(_) => Severity::Advisory,
            _ => Severity::Error,
        }
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
