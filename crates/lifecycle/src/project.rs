//! Project tab lifecycle: opening, switching between and closing projects.
//!
//! Every `initialize_project` call goes through one [`SwitchQueue`], so the
//! host never initializes two projects at once.

use std::sync::Arc;

use events::{Event, EventBus};
use serde::Serialize;
use studio_core::{HostCommand, ProjectStatus, ProjectTab};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::channel::RemoteCommandChannel;
use crate::error::Result;
use crate::switch_queue::SwitchQueue;

/// Result of closing a project tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseOutcome {
    pub next_active_path: Option<String>,
}

#[derive(Debug, Default)]
struct ProjectState {
    /// Display order.
    tabs: Vec<ProjectTab>,
    /// Never points at a tab in `Error` status.
    active: Option<String>,
}

impl ProjectState {
    fn tab_mut(&mut self, path: &str) -> Option<&mut ProjectTab> {
        self.tabs.iter_mut().find(|t| t.project_path == path)
    }

    fn is_active_and_ready(&self, path: &str) -> bool {
        self.active.as_deref() == Some(path)
            && self
                .tabs
                .iter()
                .any(|t| t.project_path == path && t.is_ready())
    }

    /// Insert a tab for `path`, or reset an existing one to `Initializing`
    /// unless `keep_ready` and it is already `Ready`.
    fn upsert_initializing(&mut self, path: &str, keep_ready: bool) {
        match self.tab_mut(path) {
            Some(tab) if keep_ready && tab.is_ready() => {}
            Some(tab) => tab.status = ProjectStatus::Initializing,
            None => self.tabs.push(ProjectTab::new(path)),
        }
    }

    /// Nearest ready tab before `index`, else the nearest one from `index` on.
    fn fallback_around(&self, index: usize) -> Option<String> {
        let split = index.min(self.tabs.len());
        let (before, after) = self.tabs.split_at(split);
        before
            .iter()
            .rev()
            .chain(after.iter())
            .find(|t| t.is_ready())
            .map(|t| t.project_path.clone())
    }
}

struct ProjectInner {
    channel: Arc<dyn RemoteCommandChannel>,
    event_bus: EventBus,
    state: RwLock<ProjectState>,
}

impl ProjectInner {
    /// Body of one queued switch; runs with the queue's service slot held.
    async fn service_switch(&self, path: String) -> Result<()> {
        {
            let state = self.state.read().await;
            if state.is_active_and_ready(&path) {
                debug!(path = %path, "Project became active while queued");
                return Ok(());
            }
            if !state.tabs.iter().any(|t| t.project_path == path) {
                debug!(path = %path, "Project tab closed while queued, skipping");
                return Ok(());
            }
        }

        info!(path = %path, "Initializing project");
        let initialized = self
            .channel
            .invoke(HostCommand::InitializeProject { path: path.clone() })
            .await;

        if let Err(err) = initialized {
            warn!(path = %path, error = %err, "Project initialization failed");
            if let Some(tab) = self.state.write().await.tab_mut(&path) {
                tab.status = ProjectStatus::Error;
            }
            self.event_bus.emit(Event::ProjectOpenFailed {
                path,
                error: err.to_string(),
            });
            return Err(err.into());
        }

        let still_open = match self.state.write().await.tab_mut(&path) {
            Some(tab) => {
                tab.status = ProjectStatus::Ready;
                true
            }
            None => false,
        };
        if !still_open {
            warn!(path = %path, "Project tab closed during initialization");
            return Ok(());
        }

        if let Err(err) = self
            .channel
            .invoke(HostCommand::AddRecentProject { path: path.clone() })
            .await
        {
            warn!(path = %path, error = %err, "Failed to record recent project");
        }

        let name = {
            let mut state = self.state.write().await;
            let name = state
                .tabs
                .iter()
                .find(|t| t.project_path == path && t.is_ready())
                .map(|t| t.project_name.clone());
            if name.is_some() {
                state.active = Some(path.clone());
            }
            name
        };

        match name {
            Some(name) => {
                info!(path = %path, "Project active");
                self.event_bus.emit(Event::ProjectOpened { path, name });
            }
            None => warn!(path = %path, "Project tab closed before activation"),
        }
        Ok(())
    }
}

/// Owns the open project tabs and the active project pointer.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ProjectCoordinator {
    inner: Arc<ProjectInner>,
    queue: SwitchQueue,
}

impl ProjectCoordinator {
    pub fn new(channel: Arc<dyn RemoteCommandChannel>, event_bus: EventBus) -> Self {
        Self {
            inner: Arc::new(ProjectInner {
                channel,
                event_bus,
                state: RwLock::new(ProjectState::default()),
            }),
            queue: SwitchQueue::new(),
        }
    }

    /// Open (or re-open) `path` and make it active.
    ///
    /// Returns whether the project ended up initialized. Failures are logged
    /// and published as [`Event::ProjectOpenFailed`], never returned.
    pub async fn open_project(&self, path: &str) -> bool {
        {
            let mut state = self.inner.state.write().await;
            if state.is_active_and_ready(path) {
                debug!(path = %path, "Project already active");
                return true;
            }
            state.upsert_initializing(path, false);
        }

        self.enqueue(path).await.is_ok()
    }

    /// Switch to `path`, queued behind any switch already in progress.
    pub async fn select_project(&self, path: &str) -> Result<()> {
        {
            let mut state = self.inner.state.write().await;
            if state.active.as_deref() == Some(path) {
                debug!(path = %path, "Project already selected");
                return Ok(());
            }
            state.upsert_initializing(path, true);
        }

        self.enqueue(path).await
    }

    fn enqueue(&self, path: &str) -> crate::switch_queue::SwitchHandle {
        let inner = Arc::clone(&self.inner);
        let owned = path.to_string();
        self.queue
            .submit(path, move || async move { inner.service_switch(owned).await })
    }

    /// Close the tab for `path`, choosing a fallback if it was active.
    pub async fn close_project(&self, path: &str) -> CloseOutcome {
        if let Err(err) = self
            .inner
            .channel
            .invoke(HostCommand::CloseProject {
                path: path.to_string(),
            })
            .await
        {
            warn!(path = %path, error = %err, "Host failed to close project, removing tab anyway");
        }

        let next_active_path = {
            let mut state = self.inner.state.write().await;
            let index = state.tabs.iter().position(|t| t.project_path == path);
            if let Some(index) = index {
                state.tabs.remove(index);
                if state.active.as_deref() == Some(path) {
                    state.active = state.fallback_around(index);
                }
            } else {
                debug!(path = %path, "No tab open for project");
            }
            state.active.clone()
        };

        info!(
            path = %path,
            next_active = next_active_path.as_deref().unwrap_or("<none>"),
            "Project closed"
        );
        self.inner.event_bus.emit(Event::ProjectClosed {
            path: path.to_string(),
            next_active_path: next_active_path.clone(),
        });

        CloseOutcome { next_active_path }
    }

    pub async fn tabs(&self) -> Vec<ProjectTab> {
        self.inner.state.read().await.tabs.clone()
    }

    pub async fn tab(&self, path: &str) -> Option<ProjectTab> {
        self.inner
            .state
            .read()
            .await
            .tabs
            .iter()
            .find(|t| t.project_path == path)
            .cloned()
    }

    pub async fn active_path(&self) -> Option<String> {
        self.inner.state.read().await.active.clone()
    }

    pub async fn active_tab(&self) -> Option<ProjectTab> {
        let state = self.inner.state.read().await;
        let active = state.active.as_deref()?;
        state.tabs.iter().find(|t| t.project_path == active).cloned()
    }

    /// Whether a switch to `path` is queued or in flight.
    pub fn is_switching_to(&self, path: &str) -> bool {
        self.queue.is_pending(path)
    }
}
