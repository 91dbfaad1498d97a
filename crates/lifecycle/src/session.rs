//! Terminal reset and agent reconfiguration for the focused pane.
//!
//! Both operations share one [`ResetGuard`]: they rebind the same terminal,
//! so a second request while one is running is ignored rather than queued.
//! Completion is declared only after the host's lifecycle signals arrive,
//! never from command resolution alone.

use std::sync::Arc;

use events::{Event, EventBus, LifecycleBus, TerminalResetDetail};
use studio_core::{AgentType, HostCommand, Selection, TerminalPair};
use tracing::{debug, info, warn};

use crate::channel::{query_terminal_exists, RemoteCommandChannel};
use crate::error::{LifecycleError, Result};
use crate::guard::ResetGuard;
use crate::signal::TerminalSignal;
use crate::start_marks::TerminalStartMarks;

/// What happened to a reset or model switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Completed,
    /// Another sequence was in flight; nothing was sent to the host.
    Skipped,
}

/// Same agent type resumes the conversation; anything else starts over.
pub fn should_force_restart(agent_type: &AgentType, previous: Option<&AgentType>) -> bool {
    previous.map_or(true, |previous| previous != agent_type)
}

pub struct SessionCoordinator {
    channel: Arc<dyn RemoteCommandChannel>,
    lifecycle: LifecycleBus,
    event_bus: EventBus,
    guard: ResetGuard,
    start_marks: TerminalStartMarks,
}

impl SessionCoordinator {
    pub fn new(
        channel: Arc<dyn RemoteCommandChannel>,
        lifecycle: LifecycleBus,
        event_bus: EventBus,
    ) -> Self {
        Self {
            channel,
            lifecycle,
            event_bus,
            guard: ResetGuard::new(),
            start_marks: TerminalStartMarks::new(),
        }
    }

    /// Share a start-mark set with the code that launches terminals.
    pub fn with_start_marks(mut self, start_marks: TerminalStartMarks) -> Self {
        self.start_marks = start_marks;
        self
    }

    pub fn start_marks(&self) -> &TerminalStartMarks {
        &self.start_marks
    }

    /// True while a reset or model switch is executing.
    pub fn is_resetting(&self) -> bool {
        self.guard.is_held()
    }

    /// Restart the agent bound to `selection` on a fresh terminal.
    pub async fn reset_session(
        &self,
        selection: &Selection,
        terminals: &TerminalPair,
    ) -> Result<ResetOutcome> {
        validate_terminals(terminals)?;

        let Some(token) = self.guard.try_acquire() else {
            warn!(selection = %selection, "Reset already in progress, ignoring request");
            return Ok(ResetOutcome::Skipped);
        };

        info!(selection = %selection, terminal_id = %terminals.top, "Resetting terminal");
        let result = self.run_reset(selection, terminals).await;
        drop(token);

        if let Err(err) = &result {
            self.notify_failure("reset_session", err);
        }
        let detail = result?;
        info!(selection = %selection, "Terminal reset complete");
        self.event_bus.emit(Event::TerminalReset { detail });
        Ok(ResetOutcome::Completed)
    }

    /// Persist a new agent configuration and restart the agent under it.
    pub async fn switch_model(
        &self,
        agent_type: &AgentType,
        skip_permissions: bool,
        selection: &Selection,
        terminals: &TerminalPair,
        previous_agent_type: Option<&AgentType>,
    ) -> Result<ResetOutcome> {
        validate_terminals(terminals)?;
        if selection.has_invalid_payload() {
            return Err(LifecycleError::validation(
                "select a session before switching its model",
            ));
        }

        let Some(token) = self.guard.try_acquire() else {
            warn!(selection = %selection, "Reset already in progress, ignoring model switch");
            return Ok(ResetOutcome::Skipped);
        };

        let force_restart = should_force_restart(agent_type, previous_agent_type);
        info!(
            selection = %selection,
            agent_type = %agent_type,
            force_restart,
            "Switching agent model"
        );
        let result = self
            .run_switch(agent_type, skip_permissions, selection, terminals, force_restart)
            .await;
        drop(token);

        if let Err(err) = &result {
            self.notify_failure("switch_model", err);
        }
        let detail = result?;
        self.event_bus.emit(Event::TerminalReset { detail });
        Ok(ResetOutcome::Completed)
    }

    async fn run_reset(
        &self,
        selection: &Selection,
        terminals: &TerminalPair,
    ) -> Result<TerminalResetDetail> {
        let top = terminals.top.as_str();

        match selection {
            Selection::Orchestrator => {
                let closed = TerminalSignal::closed(&self.lifecycle, top);
                let started = TerminalSignal::agent_started(&self.lifecycle, top);

                self.invoke(HostCommand::ResetOrchestrator {
                    terminal_id: top.to_string(),
                })
                .await?;
                tokio::try_join!(closed.wait(), started.wait())?;

                Ok(TerminalResetDetail::Orchestrator)
            }
            Selection::Session(_) => {
                let Some(session_id) = selection.session_id() else {
                    // No usable session: refresh the pane as the orchestrator
                    // without touching the host.
                    warn!(
                        terminal_id = %top,
                        "Session selection has no usable id, skipping backend reset"
                    );
                    return Ok(TerminalResetDetail::Orchestrator);
                };

                let started = TerminalSignal::agent_started(&self.lifecycle, top);
                self.close_if_exists(top).await?;
                self.invoke(HostCommand::StartSessionAgentWithRestart {
                    session_name: session_id.to_string(),
                    force_restart: true,
                })
                .await?;
                started.wait().await?;

                Ok(TerminalResetDetail::Session {
                    session_id: session_id.to_string(),
                })
            }
        }
    }

    async fn run_switch(
        &self,
        agent_type: &AgentType,
        skip_permissions: bool,
        selection: &Selection,
        terminals: &TerminalPair,
        force_restart: bool,
    ) -> Result<TerminalResetDetail> {
        let top = terminals.top.as_str();

        // The restart command reads persisted settings, so these land first.
        self.invoke(HostCommand::SetSkipPermissions {
            enabled: skip_permissions,
        })
        .await?;
        self.invoke(HostCommand::SetAgentType {
            agent_type: agent_type.clone(),
        })
        .await?;

        let started = TerminalSignal::agent_started(&self.lifecycle, top);
        let exists = query_terminal_exists(self.channel.as_ref(), top).await?;

        let mut marked = false;
        let result: Result<()> = async {
            if exists {
                marked = self.start_marks.mark(top);
                let closed = TerminalSignal::closed(&self.lifecycle, top);
                self.invoke(HostCommand::CloseTerminal {
                    terminal_id: top.to_string(),
                })
                .await?;
                closed.wait().await?;
            } else {
                debug!(terminal_id = %top, "Terminal not running, starting directly");
            }

            self.invoke(start_command(selection, top, force_restart))
                .await?;
            started.wait().await?;
            Ok(())
        }
        .await;

        // Orchestrator marks are cleared by the terminal owner once it sees
        // the agent running.
        if marked && !selection.is_orchestrator() {
            self.start_marks.clear(top);
        }
        result?;

        Ok(reset_detail(selection))
    }

    /// Close `terminal_id` if the host still has it, waiting for the closed
    /// signal. Returns whether a close was issued.
    async fn close_if_exists(&self, terminal_id: &str) -> Result<bool> {
        if !query_terminal_exists(self.channel.as_ref(), terminal_id).await? {
            debug!(terminal_id = %terminal_id, "Terminal already gone");
            return Ok(false);
        }

        let closed = TerminalSignal::closed(&self.lifecycle, terminal_id);
        self.invoke(HostCommand::CloseTerminal {
            terminal_id: terminal_id.to_string(),
        })
        .await?;
        closed.wait().await?;
        Ok(true)
    }

    fn notify_failure(&self, operation: &str, err: &LifecycleError) {
        warn!(operation, error = %err, "Terminal operation failed");
        self.event_bus.emit(Event::Error {
            message: err.to_string(),
            context: Some(operation.to_string()),
        });
    }

    async fn invoke(&self, command: HostCommand) -> Result<serde_json::Value> {
        debug!(command = command.name(), "Invoking host command");
        Ok(self.channel.invoke(command).await?)
    }
}

fn validate_terminals(terminals: &TerminalPair) -> Result<()> {
    if terminals.top.trim().is_empty() {
        return Err(LifecycleError::validation("no terminal is bound to the focused pane"));
    }
    Ok(())
}

fn start_command(selection: &Selection, terminal_id: &str, force_restart: bool) -> HostCommand {
    match selection.session_id() {
        Some(session_id) => HostCommand::StartSessionAgentWithRestart {
            session_name: session_id.to_string(),
            force_restart,
        },
        None => HostCommand::StartClaudeOrchestrator {
            terminal_id: terminal_id.to_string(),
            force_restart,
        },
    }
}

fn reset_detail(selection: &Selection) -> TerminalResetDetail {
    match selection.session_id() {
        Some(session_id) => TerminalResetDetail::Session {
            session_id: session_id.to_string(),
        },
        None => TerminalResetDetail::Orchestrator,
    }
}
