use lifecycle::CommandError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Event stream error: {0}")]
    EventStream(String),
}

pub type Result<T> = std::result::Result<T, HostError>;

impl From<HostError> for CommandError {
    fn from(err: HostError) -> Self {
        CommandError::Transport(err.to_string())
    }
}
