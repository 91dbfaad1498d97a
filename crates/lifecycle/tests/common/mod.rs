//! Scripted host used by the lifecycle integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use events::LifecycleBus;
use lifecycle::{CommandError, RemoteCommandChannel};
use serde_json::Value;
use studio_core::{HostCommand, LifecycleEvent};
use tokio::sync::Notify;

/// In-memory stand-in for the host process.
///
/// Records every command, can hold a command open until released, can fail
/// commands by name, and publishes the lifecycle signals a real host would
/// emit for terminal commands (before the command resolves).
pub struct ScriptedChannel {
    lifecycle: LifecycleBus,
    calls: Mutex<Vec<HostCommand>>,
    terminals: Mutex<HashSet<String>>,
    failures: Mutex<HashMap<String, String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    session_terminal: Mutex<String>,
    emit_signals: AtomicBool,
}

impl ScriptedChannel {
    pub fn new(lifecycle: LifecycleBus) -> Arc<Self> {
        Arc::new(Self {
            lifecycle,
            calls: Mutex::new(Vec::new()),
            terminals: Mutex::new(HashSet::new()),
            failures: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            session_terminal: Mutex::new("t-top".to_string()),
            emit_signals: AtomicBool::new(true),
        })
    }

    pub fn with_terminal(self: Arc<Self>, terminal_id: &str) -> Arc<Self> {
        self.terminals.lock().unwrap().insert(terminal_id.to_string());
        self
    }

    /// Resolve terminal commands without publishing lifecycle signals; the
    /// test publishes them itself.
    pub fn mute_signals(&self) {
        self.emit_signals.store(false, Ordering::SeqCst);
    }

    pub fn terminal_exists(&self, terminal_id: &str) -> bool {
        self.terminals.lock().unwrap().contains(terminal_id)
    }

    /// Make every call matching `key` reject with `message`.
    pub fn fail(&self, key: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(key.to_string(), message.to_string());
    }

    pub fn succeed(&self, key: &str) {
        self.failures.lock().unwrap().remove(key);
    }

    /// Hold calls matching `key` until the returned handle is notified.
    pub fn hold(&self, key: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(key.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<HostCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(|c| c.name()).collect()
    }

    pub fn count(&self, key: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| call_key(c) == key || c.name() == key)
            .count()
    }

    /// Poll until at least `n` calls match `key`.
    pub async fn wait_for_calls(&self, key: &str, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.count(key) < n {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {} call(s) to {}", n, key));
    }

    fn publish_closed(&self, terminal_id: &str) {
        self.terminals.lock().unwrap().remove(terminal_id);
        if !self.emit_signals.load(Ordering::SeqCst) {
            return;
        }
        self.lifecycle.publish(LifecycleEvent::TerminalClosed {
            terminal_id: terminal_id.to_string(),
        });
    }

    fn publish_started(&self, terminal_id: &str, session_name: Option<&str>) {
        self.terminals.lock().unwrap().insert(terminal_id.to_string());
        if !self.emit_signals.load(Ordering::SeqCst) {
            return;
        }
        self.lifecycle.publish(LifecycleEvent::TerminalAgentStarted {
            terminal_id: terminal_id.to_string(),
            session_name: session_name.map(String::from),
        });
    }
}

/// `initialize_project:/path` for initialization, the command name otherwise.
pub fn call_key(command: &HostCommand) -> String {
    match command {
        HostCommand::InitializeProject { path } => format!("initialize_project:{}", path),
        other => other.name().to_string(),
    }
}

#[async_trait]
impl RemoteCommandChannel for ScriptedChannel {
    async fn invoke(&self, command: HostCommand) -> Result<Value, CommandError> {
        self.calls.lock().unwrap().push(command.clone());
        let key = call_key(&command);

        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let failure = {
            let failures = self.failures.lock().unwrap();
            failures
                .get(&key)
                .or_else(|| failures.get(command.name()))
                .cloned()
        };
        if let Some(message) = failure {
            return Err(CommandError::rejected(command.name(), message));
        }

        match command {
            HostCommand::TerminalExists { terminal_id } => {
                Ok(Value::Bool(self.terminal_exists(&terminal_id)))
            }
            HostCommand::CloseTerminal { terminal_id } => {
                self.publish_closed(&terminal_id);
                Ok(Value::Null)
            }
            HostCommand::ResetOrchestrator { terminal_id } => {
                self.publish_closed(&terminal_id);
                self.publish_started(&terminal_id, None);
                Ok(Value::String(terminal_id))
            }
            HostCommand::StartClaudeOrchestrator { terminal_id, .. } => {
                self.publish_started(&terminal_id, None);
                Ok(Value::Null)
            }
            HostCommand::StartSessionAgentWithRestart { session_name, .. } => {
                let terminal_id = self.session_terminal.lock().unwrap().clone();
                self.publish_started(&terminal_id, Some(&session_name));
                Ok(Value::Null)
            }
            _ => Ok(Value::Null),
        }
    }
}
