//! Domain types shared by the workspace studio crates.
//!
//! Project tabs, agent selections, terminal bindings and the wire types
//! exchanged with the host process that owns terminals and worktrees.

pub mod domain;
pub mod error;
pub mod protocol;

pub use domain::*;
pub use error::{CoreError, Result};
pub use protocol::{HostCommand, LifecycleEvent, LifecycleEventKind};
