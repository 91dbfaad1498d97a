//! Host lifecycle signals delivered over server-sent events.

use eventsource_stream::Eventsource;
use events::LifecycleBus;
use futures::StreamExt;
use serde::Deserialize;
use studio_core::LifecycleEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{HostError, Result};

/// Wire shape of a host frame. Frames we do not know are skipped.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum HostFrame {
    TerminalClosed {
        terminal_id: String,
    },
    TerminalAgentStarted {
        terminal_id: String,
        #[serde(default)]
        session_name: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl HostFrame {
    fn into_lifecycle(self) -> Option<LifecycleEvent> {
        match self {
            Self::TerminalClosed { terminal_id } => {
                Some(LifecycleEvent::TerminalClosed { terminal_id })
            }
            Self::TerminalAgentStarted {
                terminal_id,
                session_name,
            } => Some(LifecycleEvent::TerminalAgentStarted {
                terminal_id,
                session_name,
            }),
            Self::Unknown => None,
        }
    }
}

fn parse_frame(data: &str) -> Result<Option<LifecycleEvent>> {
    let frame: HostFrame = serde_json::from_str(data)?;
    Ok(frame.into_lifecycle())
}

pub struct HostEventStream {
    base_url: String,
    client: reqwest::Client,
}

impl HostEventStream {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub async fn connect(&self) -> Result<EventReceiver> {
        let url = format!("{}/events", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HostError::Connection(format!(
                "Failed to connect to event stream: {}",
                response.status()
            )));
        }

        let (tx, rx) = mpsc::channel::<Result<LifecycleEvent>>(100);
        let byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut event_stream = byte_stream.eventsource();

            while let Some(event_result) = event_stream.next().await {
                match event_result {
                    Ok(event) => {
                        if event.data.is_empty() {
                            continue;
                        }

                        match parse_frame(&event.data) {
                            Ok(Some(parsed)) => {
                                if tx.send(Ok(parsed)).await.is_err() {
                                    break;
                                }
                            }
                            Ok(None) => {
                                debug!(data = %event.data, "Ignoring unknown host frame");
                            }
                            Err(e) => {
                                warn!(error = %e, data = %event.data, "Failed to parse host frame");
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(HostError::EventStream(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        info!(url = %url, "Connected to host event stream");
        Ok(EventReceiver { rx })
    }

    /// Connect and forward every signal onto `bus` until the stream ends.
    pub async fn spawn(&self, bus: LifecycleBus) -> Result<JoinHandle<()>> {
        let mut receiver = self.connect().await?;

        Ok(tokio::spawn(async move {
            while let Some(next) = receiver.next_event().await {
                match next {
                    Ok(event) => {
                        debug!(
                            kind = event.kind().as_str(),
                            terminal_id = %event.terminal_id(),
                            "Host lifecycle signal"
                        );
                        bus.publish(event);
                    }
                    Err(e) => {
                        warn!(error = %e, "Host event stream failed");
                        break;
                    }
                }
            }
            info!("Host event stream ended");
        }))
    }
}

pub struct EventReceiver {
    rx: mpsc::Receiver<Result<LifecycleEvent>>,
}

impl EventReceiver {
    pub async fn next_event(&mut self) -> Option<Result<LifecycleEvent>> {
        self.rx.recv().await
    }
}
