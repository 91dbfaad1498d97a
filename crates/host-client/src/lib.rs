pub mod client;
pub mod error;
pub mod events;

pub use client::HostClient;
pub use error::{HostError, Result};
pub use events::{EventReceiver, HostEventStream};
