use async_trait::async_trait;
use lifecycle::{CommandError, RemoteCommandChannel};
use reqwest::Client;
use serde_json::Value;
use studio_core::HostCommand;
use tracing::debug;

use crate::error::HostError;

/// HTTP transport for host commands.
///
/// Each command is a `POST {base}/commands/{name}` with the command arguments
/// as the JSON body.
pub struct HostClient {
    base_url: String,
    client: Client,
}

impl HostClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn command_url(&self, name: &str) -> String {
        format!("{}/commands/{}", self.base_url, name)
    }

    async fn handle_response(
        &self,
        command: &str,
        response: reqwest::Response,
    ) -> Result<Value, CommandError> {
        let status = response.status();
        let body = response.text().await.map_err(HostError::Request)?;

        if !status.is_success() {
            let message = if body.trim().is_empty() {
                format!("status {}", status)
            } else {
                body
            };
            return Err(CommandError::rejected(command, message));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| CommandError::InvalidResponse {
            command: command.to_string(),
            detail: e.to_string(),
        })
    }
}

#[async_trait]
impl RemoteCommandChannel for HostClient {
    async fn invoke(&self, command: HostCommand) -> Result<Value, CommandError> {
        let name = command.name();
        debug!(command = name, "Sending host command");

        let response = self
            .client
            .post(self.command_url(name))
            .json(&command.args())
            .send()
            .await
            .map_err(HostError::Request)?;

        self.handle_response(name, response).await
    }
}
