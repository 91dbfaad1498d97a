//! Terminal reset and model switching against a scripted host.

mod common;

use std::sync::Arc;

use common::ScriptedChannel;
use events::{Event, EventBus, LifecycleBus, TerminalResetDetail};
use lifecycle::{LifecycleError, ResetOutcome, SessionCoordinator};
use studio_core::{AgentType, HostCommand, LifecycleEventKind, Selection, TerminalPair};

struct Harness {
    coordinator: Arc<SessionCoordinator>,
    channel: Arc<ScriptedChannel>,
    lifecycle: LifecycleBus,
    event_bus: EventBus,
}

fn harness(existing_terminals: &[&str]) -> Harness {
    let lifecycle = LifecycleBus::new();
    let mut channel = ScriptedChannel::new(lifecycle.clone());
    for terminal in existing_terminals {
        channel = channel.with_terminal(terminal);
    }
    let event_bus = EventBus::new();
    let coordinator = Arc::new(SessionCoordinator::new(
        channel.clone(),
        lifecycle.clone(),
        event_bus.clone(),
    ));
    Harness {
        coordinator,
        channel,
        lifecycle,
        event_bus,
    }
}

fn terminals() -> TerminalPair {
    TerminalPair::new("t-top", "t-bottom")
}

fn agent(name: &str) -> AgentType {
    AgentType::new(name).unwrap()
}

fn assert_no_listeners(lifecycle: &LifecycleBus) {
    assert_eq!(lifecycle.listener_count(LifecycleEventKind::TerminalClosed), 0);
    assert_eq!(
        lifecycle.listener_count(LifecycleEventKind::TerminalAgentStarted),
        0
    );
}

mod reset_session {
    use super::*;

    #[tokio::test]
    async fn test_session_reset_closes_then_restarts() {
        let h = harness(&["t-top"]);
        let mut rx = h.event_bus.subscribe();

        let outcome = h
            .coordinator
            .reset_session(&Selection::session("s1"), &terminals())
            .await
            .unwrap();

        assert_eq!(outcome, ResetOutcome::Completed);
        assert_eq!(
            h.channel.calls(),
            vec![
                HostCommand::TerminalExists {
                    terminal_id: "t-top".to_string()
                },
                HostCommand::CloseTerminal {
                    terminal_id: "t-top".to_string()
                },
                HostCommand::StartSessionAgentWithRestart {
                    session_name: "s1".to_string(),
                    force_restart: true,
                },
            ]
        );
        assert_eq!(
            rx.try_recv().unwrap().event,
            Event::TerminalReset {
                detail: TerminalResetDetail::Session {
                    session_id: "s1".to_string()
                }
            }
        );
        assert!(!h.coordinator.is_resetting());
        assert_no_listeners(&h.lifecycle);
    }

    #[tokio::test]
    async fn test_session_reset_without_live_terminal_skips_close() {
        let h = harness(&[]);

        h.coordinator
            .reset_session(&Selection::session("s1"), &terminals())
            .await
            .unwrap();

        assert_eq!(
            h.channel.call_names(),
            vec!["terminal_exists", "start_session_agent_with_restart"]
        );
        assert_no_listeners(&h.lifecycle);
    }

    #[tokio::test]
    async fn test_orchestrator_reset_waits_for_both_signals() {
        let h = harness(&["t-top"]);
        let mut rx = h.event_bus.subscribe();

        let outcome = h
            .coordinator
            .reset_session(&Selection::Orchestrator, &terminals())
            .await
            .unwrap();

        assert_eq!(outcome, ResetOutcome::Completed);
        assert_eq!(h.channel.call_names(), vec!["reset_orchestrator"]);
        assert_eq!(
            rx.try_recv().unwrap().event,
            Event::TerminalReset {
                detail: TerminalResetDetail::Orchestrator
            }
        );
        assert_no_listeners(&h.lifecycle);
    }

    #[tokio::test]
    async fn test_second_reset_while_in_flight_is_ignored() {
        let h = harness(&["t-top"]);
        let gate = h.channel.hold("reset_orchestrator");

        let first = {
            let coordinator = h.coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .reset_session(&Selection::Orchestrator, &terminals())
                    .await
            })
        };
        h.channel.wait_for_calls("reset_orchestrator", 1).await;
        assert!(h.coordinator.is_resetting());

        let second = h
            .coordinator
            .reset_session(&Selection::session("s1"), &terminals())
            .await
            .unwrap();
        assert_eq!(second, ResetOutcome::Skipped);
        assert_eq!(h.channel.calls().len(), 1);

        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), ResetOutcome::Completed);
        assert_eq!(h.channel.call_names(), vec!["reset_orchestrator"]);
        assert!(!h.coordinator.is_resetting());
    }

    #[tokio::test]
    async fn test_rejected_command_releases_guard_and_reports_error() {
        let h = harness(&["t-top"]);
        h.channel.fail("reset_orchestrator", "pty spawn failed");
        let mut rx = h.event_bus.subscribe();

        let err = h
            .coordinator
            .reset_session(&Selection::Orchestrator, &terminals())
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Command(_)));
        assert!(err.to_string().contains("pty spawn failed"));
        assert!(!h.coordinator.is_resetting());
        match rx.try_recv().unwrap().event {
            Event::Error { message, context } => {
                assert!(message.contains("pty spawn failed"));
                assert_eq!(context.as_deref(), Some("reset_session"));
            }
            other => panic!("expected error notice, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
        assert_no_listeners(&h.lifecycle);
    }

    #[tokio::test]
    async fn test_failed_start_leaves_terminal_closed() {
        let h = harness(&["t-top"]);
        h.channel
            .fail("start_session_agent_with_restart", "worktree missing");

        let err = h
            .coordinator
            .reset_session(&Selection::session("s1"), &terminals())
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Command(_)));
        assert!(!h.channel.terminal_exists("t-top"));
        assert!(!h.coordinator.is_resetting());
    }

    #[tokio::test]
    async fn test_blank_session_id_refreshes_without_host_calls() {
        let h = harness(&["t-top"]);
        let mut rx = h.event_bus.subscribe();

        let outcome = h
            .coordinator
            .reset_session(&Selection::session(""), &terminals())
            .await
            .unwrap();

        assert_eq!(outcome, ResetOutcome::Completed);
        assert!(h.channel.calls().is_empty());
        assert_eq!(
            rx.try_recv().unwrap().event,
            Event::TerminalReset {
                detail: TerminalResetDetail::Orchestrator
            }
        );
    }

    #[tokio::test]
    async fn test_missing_terminal_is_advisory_and_leaves_guard_free() {
        let h = harness(&[]);

        let err = h
            .coordinator
            .reset_session(&Selection::Orchestrator, &TerminalPair::new("", "t-bottom"))
            .await
            .unwrap_err();

        assert_eq!(err.severity(), lifecycle::Severity::Advisory);
        assert!(h.channel.calls().is_empty());
        assert!(!h.coordinator.is_resetting());
    }
}

mod switch_model {
    use super::*;

    fn force_restart_flags(channel: &ScriptedChannel) -> Vec<bool> {
        channel
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCommand::StartSessionAgentWithRestart { force_restart, .. }
                | HostCommand::StartClaudeOrchestrator { force_restart, .. } => {
                    Some(force_restart)
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_same_agent_type_resumes() {
        let h = harness(&["t-top"]);

        h.coordinator
            .switch_model(
                &agent("claude"),
                false,
                &Selection::session("s1"),
                &terminals(),
                Some(&agent("claude")),
            )
            .await
            .unwrap();

        assert_eq!(force_restart_flags(&h.channel), vec![false]);
    }

    #[tokio::test]
    async fn test_different_agent_type_forces_restart() {
        let h = harness(&["t-top"]);

        h.coordinator
            .switch_model(
                &agent("codex"),
                true,
                &Selection::session("s1"),
                &terminals(),
                Some(&agent("claude")),
            )
            .await
            .unwrap();

        assert_eq!(force_restart_flags(&h.channel), vec![true]);
    }

    #[tokio::test]
    async fn test_configuration_persisted_before_restart() {
        let h = harness(&["t-top"]);
        let mut rx = h.event_bus.subscribe();

        h.coordinator
            .switch_model(
                &agent("codex"),
                true,
                &Selection::Orchestrator,
                &terminals(),
                None,
            )
            .await
            .unwrap();

        let calls = h.channel.calls();
        assert_eq!(calls[0], HostCommand::SetSkipPermissions { enabled: true });
        assert_eq!(
            calls[1],
            HostCommand::SetAgentType {
                agent_type: agent("codex")
            }
        );
        assert_eq!(
            h.channel.call_names()[2..],
            [
                "terminal_exists",
                "close_terminal",
                "start_claude_orchestrator"
            ]
        );
        assert_eq!(
            rx.try_recv().unwrap().event,
            Event::TerminalReset {
                detail: TerminalResetDetail::Orchestrator
            }
        );
        assert_no_listeners(&h.lifecycle);
    }

    #[tokio::test]
    async fn test_absent_terminal_starts_directly() {
        let h = harness(&[]);

        h.coordinator
            .switch_model(
                &agent("claude"),
                false,
                &Selection::Orchestrator,
                &terminals(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            h.channel.call_names(),
            vec![
                "set_skip_permissions",
                "set_agent_type",
                "terminal_exists",
                "start_claude_orchestrator"
            ]
        );
        assert!(!h.coordinator.start_marks().is_starting("t-top"));
    }

    #[tokio::test]
    async fn test_orchestrator_start_mark_left_for_owner() {
        let h = harness(&["t-top"]);

        h.coordinator
            .switch_model(
                &agent("claude"),
                false,
                &Selection::Orchestrator,
                &terminals(),
                None,
            )
            .await
            .unwrap();

        assert!(h.coordinator.start_marks().is_starting("t-top"));
        assert!(h.coordinator.start_marks().clear("t-top"));
    }

    #[tokio::test]
    async fn test_session_start_mark_cleared_after_switch() {
        let h = harness(&["t-top"]);

        h.coordinator
            .switch_model(
                &agent("claude"),
                false,
                &Selection::session("s1"),
                &terminals(),
                None,
            )
            .await
            .unwrap();

        assert!(!h.coordinator.start_marks().is_starting("t-top"));
    }

    #[tokio::test]
    async fn test_rejected_persist_releases_guard() {
        let h = harness(&["t-top"]);
        h.channel.fail("set_agent_type", "unknown agent");

        let err = h
            .coordinator
            .switch_model(
                &agent("nope"),
                false,
                &Selection::session("s1"),
                &terminals(),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Command(_)));
        assert!(!h.coordinator.is_resetting());
        assert_eq!(
            h.channel.call_names(),
            vec!["set_skip_permissions", "set_agent_type"]
        );
        assert_no_listeners(&h.lifecycle);
    }

    #[tokio::test]
    async fn test_switch_ignored_while_reset_in_flight() {
        let h = harness(&["t-top"]);
        let gate = h.channel.hold("reset_orchestrator");

        let reset = {
            let coordinator = h.coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .reset_session(&Selection::Orchestrator, &terminals())
                    .await
            })
        };
        h.channel.wait_for_calls("reset_orchestrator", 1).await;

        let outcome = h
            .coordinator
            .switch_model(
                &agent("codex"),
                false,
                &Selection::Orchestrator,
                &terminals(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(outcome, ResetOutcome::Skipped);

        gate.notify_one();
        reset.await.unwrap().unwrap();
        assert_eq!(h.channel.call_names(), vec!["reset_orchestrator"]);
    }

    #[tokio::test]
    async fn test_blank_session_id_is_rejected_before_host() {
        let h = harness(&["t-top"]);

        let err = h
            .coordinator
            .switch_model(
                &agent("claude"),
                false,
                &Selection::session(" "),
                &terminals(),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Validation(_)));
        assert!(h.channel.calls().is_empty());
    }
}

mod signal_waits {
    use super::*;
    use std::time::Duration;
    use studio_core::LifecycleEvent;
    use tokio::task::JoinHandle;

    fn closed(terminal_id: &str) -> LifecycleEvent {
        LifecycleEvent::TerminalClosed {
            terminal_id: terminal_id.to_string(),
        }
    }

    fn started(terminal_id: &str, session_name: Option<&str>) -> LifecycleEvent {
        LifecycleEvent::TerminalAgentStarted {
            terminal_id: terminal_id.to_string(),
            session_name: session_name.map(String::from),
        }
    }

    fn spawn_reset(h: &Harness, selection: Selection) -> JoinHandle<lifecycle::Result<ResetOutcome>> {
        let coordinator = h.coordinator.clone();
        tokio::spawn(async move { coordinator.reset_session(&selection, &terminals()).await })
    }

    /// Let the spawned sequence run as far as it can.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    async fn assert_in_flight(
        h: &Harness,
        task: &JoinHandle<lifecycle::Result<ResetOutcome>>,
        rx: &mut tokio::sync::broadcast::Receiver<events::EventEnvelope>,
    ) {
        settle().await;
        assert!(h.coordinator.is_resetting());
        assert!(!task.is_finished());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_orchestrator_reset_needs_closed_and_started() {
        let h = harness(&["t-top"]);
        h.channel.mute_signals();
        let mut rx = h.event_bus.subscribe();

        let reset = spawn_reset(&h, Selection::Orchestrator);
        h.channel.wait_for_calls("reset_orchestrator", 1).await;
        assert_in_flight(&h, &reset, &mut rx).await;

        h.lifecycle.publish(closed("t-top"));
        assert_in_flight(&h, &reset, &mut rx).await;

        h.lifecycle.publish(started("t-top", None));
        assert_eq!(reset.await.unwrap().unwrap(), ResetOutcome::Completed);
        assert!(!h.coordinator.is_resetting());
        assert_eq!(
            rx.try_recv().unwrap().event,
            Event::TerminalReset {
                detail: TerminalResetDetail::Orchestrator
            }
        );
        assert_no_listeners(&h.lifecycle);
    }

    #[tokio::test]
    async fn test_orchestrator_reset_started_alone_is_not_enough() {
        let h = harness(&["t-top"]);
        h.channel.mute_signals();
        let mut rx = h.event_bus.subscribe();

        let reset = spawn_reset(&h, Selection::Orchestrator);
        h.channel.wait_for_calls("reset_orchestrator", 1).await;

        h.lifecycle.publish(started("t-top", None));
        assert_in_flight(&h, &reset, &mut rx).await;

        h.lifecycle.publish(closed("t-top"));
        assert_eq!(reset.await.unwrap().unwrap(), ResetOutcome::Completed);
    }

    #[tokio::test]
    async fn test_session_reset_starts_only_after_closed_and_waits_for_started() {
        let h = harness(&["t-top"]);
        h.channel.mute_signals();
        let mut rx = h.event_bus.subscribe();

        let reset = spawn_reset(&h, Selection::session("s1"));
        h.channel.wait_for_calls("close_terminal", 1).await;
        assert_in_flight(&h, &reset, &mut rx).await;
        assert_eq!(h.channel.count("start_session_agent_with_restart"), 0);

        h.lifecycle.publish(closed("t-top"));
        h.channel
            .wait_for_calls("start_session_agent_with_restart", 1)
            .await;
        assert_in_flight(&h, &reset, &mut rx).await;

        h.lifecycle.publish(started("t-other", Some("s2")));
        assert_in_flight(&h, &reset, &mut rx).await;

        h.lifecycle.publish(started("t-top", Some("s1")));
        assert_eq!(reset.await.unwrap().unwrap(), ResetOutcome::Completed);
        assert!(!h.coordinator.is_resetting());
        assert_eq!(
            rx.try_recv().unwrap().event,
            Event::TerminalReset {
                detail: TerminalResetDetail::Session {
                    session_id: "s1".to_string()
                }
            }
        );
        assert_no_listeners(&h.lifecycle);
    }

    #[tokio::test]
    async fn test_switch_model_waits_for_each_signal() {
        let h = harness(&["t-top"]);
        h.channel.mute_signals();
        let mut rx = h.event_bus.subscribe();

        let switch = {
            let coordinator = h.coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .switch_model(
                        &agent("codex"),
                        false,
                        &Selection::Orchestrator,
                        &terminals(),
                        Some(&agent("claude")),
                    )
                    .await
            })
        };

        h.channel.wait_for_calls("close_terminal", 1).await;
        assert_in_flight(&h, &switch, &mut rx).await;
        assert_eq!(h.channel.count("start_claude_orchestrator"), 0);

        h.lifecycle.publish(closed("t-top"));
        h.channel.wait_for_calls("start_claude_orchestrator", 1).await;
        assert_in_flight(&h, &switch, &mut rx).await;

        h.lifecycle.publish(started("t-top", None));
        assert_eq!(switch.await.unwrap().unwrap(), ResetOutcome::Completed);
        assert!(!h.coordinator.is_resetting());
        assert!(matches!(
            rx.try_recv().unwrap().event,
            Event::TerminalReset { .. }
        ));
    }

    #[tokio::test]
    async fn test_burst_of_unrelated_signals_does_not_strand_reset() {
        let h = harness(&["t-top"]);
        h.channel.mute_signals();

        let reset = spawn_reset(&h, Selection::Orchestrator);
        h.channel.wait_for_calls("reset_orchestrator", 1).await;

        h.lifecycle.publish(closed("t-top"));
        h.lifecycle.publish(started("t-top", None));
        for i in 0..200 {
            h.lifecycle.publish(closed(&format!("other-{}", i)));
        }

        let outcome = tokio::time::timeout(Duration::from_secs(2), reset)
            .await
            .expect("reset stayed in flight")
            .unwrap()
            .unwrap();
        assert_eq!(outcome, ResetOutcome::Completed);
        assert!(!h.coordinator.is_resetting());
    }
}
