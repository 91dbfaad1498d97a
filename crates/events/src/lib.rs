//! Event system for the workspace studio
//!
//! Two channels live here: the UI [`EventBus`] that rendering layers listen
//! to, and the [`LifecycleBus`] carrying host signals about terminals.

mod bus;
mod lifecycle;
mod types;

pub use bus::EventBus;
pub use lifecycle::{LifecycleBus, LifecycleSubscription};
pub use types::*;
