mod project;
mod selection;

pub use project::{project_name_from_path, ProjectStatus, ProjectTab};
pub use selection::{AgentType, Selection, TerminalId, TerminalPair};
