use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Initializing,
    Ready,
    Error,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "initializing" => Ok(Self::Initializing),
            "ready" => Ok(Self::Ready),
            "error" => Ok(Self::Error),
            other => Err(CoreError::UnknownProjectStatus(other.to_string())),
        }
    }
}

/// One open project in the tab strip.
///
/// `project_path` is the unique key; the name is derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProjectTab {
    pub project_path: String,
    pub project_name: String,
    pub status: ProjectStatus,
}

impl ProjectTab {
    pub fn new(project_path: impl Into<String>) -> Self {
        let project_path = project_path.into();
        Self {
            project_name: project_name_from_path(&project_path),
            project_path,
            status: ProjectStatus::default(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ProjectStatus::Ready
    }
}

/// Last path component, or the whole path when there is none (e.g. `/`).
pub fn project_name_from_path(path: &str) -> String {
    Path::new(path.trim_end_matches(['/', '\\']))
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .unwrap_or_else(|| path.to_string())
}
