//! Request/response seam to the host process.

use async_trait::async_trait;
use serde_json::Value;
use studio_core::HostCommand;

use crate::error::CommandError;

/// Issues commands to the process that owns terminals and worktrees.
///
/// A call either resolves with the host's JSON result or rejects; there are
/// no partial results.
#[async_trait]
pub trait RemoteCommandChannel: Send + Sync {
    async fn invoke(&self, command: HostCommand) -> Result<Value, CommandError>;
}

/// Ask the host whether `terminal_id` is currently alive.
pub async fn query_terminal_exists(
    channel: &dyn RemoteCommandChannel,
    terminal_id: &str,
) -> Result<bool, CommandError> {
    let command = HostCommand::TerminalExists {
        terminal_id: terminal_id.to_string(),
    };
    let name = command.name();
    let value = channel.invoke(command).await?;

    value.as_bool().ok_or_else(|| CommandError::InvalidResponse {
        command: name.to_string(),
        detail: format!("expected a boolean, got {}", value),
    })
}
