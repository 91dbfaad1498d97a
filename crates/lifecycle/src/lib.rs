//! Lifecycle coordination between the studio window and the host process.
//!
//! [`ProjectCoordinator`] owns the open project tabs and serializes project
//! switches. [`SessionCoordinator`] rebinds the focused terminal to a fresh
//! agent and waits for the host to confirm each step.

pub mod channel;
pub mod error;
pub mod guard;
pub mod project;
pub mod session;
pub mod signal;
pub mod start_marks;
pub mod switch_queue;

pub use channel::RemoteCommandChannel;
pub use error::{CommandError, LifecycleError, Result, Severity};
pub use guard::{ResetGuard, ResetGuardToken};
pub use project::{CloseOutcome, ProjectCoordinator};
pub use session::{should_force_restart, ResetOutcome, SessionCoordinator};
pub use signal::TerminalSignal;
pub use start_marks::TerminalStartMarks;
pub use switch_queue::SwitchQueue;
