use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{HostError, HostStep, RunError};

use super::traits::{HostApplication, HostPlugin, HostProject};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    ProfileActive,
    ProjectOpen,
    Executed,
    Persisted,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Created => "created",
            SessionState::ProfileActive => "profile-active",
            SessionState::ProjectOpen => "project-open",
            SessionState::Executed => "executed",
            SessionState::Persisted => "persisted",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Lifecycle of one host instance serving exactly one project.
///
/// Steps must be called in order: `activate_profile`, `open_project`, `run`,
/// `persist`, `close`. `close` may be called from any state and never fails.
pub struct HostSession {
    app: Box<dyn HostApplication>,
    active_profile: Option<String>,
    project: Option<Box<dyn HostProject>>,
    project_path: Option<PathBuf>,
    state: SessionState,
}

impl HostSession {
    pub async fn open(plugin: &dyn HostPlugin, version: &str) -> Result<Self, RunError> {
        tracing::info!(target: "egrun.host", host = plugin.name(), version, "opening host");
        let app = plugin.launch(version).await.map_err(|e| match e {
            HostError::VersionNotFound { version } => RunError::HostVersionNotFound { version },
            other => RunError::HostSetup {
                step: HostStep::Launch,
                message: other.to_string(),
            },
        })?;

        Ok(Self {
            app,
            active_profile: None,
            project: None,
            project_path: None,
            state: SessionState::Created,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn active_profile(&self) -> Option<&str> {
        self.active_profile.as_deref()
    }

    pub async fn activate_profile(&mut self, profile: &str) -> Result<(), RunError> {
        self.expect_state(SessionState::Created, "activate a profile")?;
        tracing::info!(target: "egrun.host", profile, "activating profile");

        self.app
            .set_active_profile(profile)
            .await
            .map_err(|e| match e {
                HostError::ProfileNotFound { profile } => RunError::ProfileNotFound { profile },
                other => RunError::HostSetup {
                    step: HostStep::ActivateProfile,
                    message: other.to_string(),
                },
            })?;

        self.active_profile = Some(profile.to_string());
        self.state = SessionState::ProfileActive;
        Ok(())
    }

    pub async fn open_project(&mut self, path: &Path) -> Result<(), RunError> {
        self.expect_state(SessionState::ProfileActive, "open a project")?;
        tracing::info!(target: "egrun.host", path = %path.display(), "opening project");

        let project = self
            .app
            .open_project(path)
            .await
            .map_err(|e| RunError::HostOpen {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        self.project = Some(project);
        self.project_path = Some(path.to_path_buf());
        self.state = SessionState::ProjectOpen;
        Ok(())
    }

    /// Blocks for as long as the host runs the project.
    pub async fn run(&mut self) -> Result<(), RunError> {
        self.expect_state(SessionState::ProjectOpen, "run")?;
        let path = self.project_path.clone().unwrap_or_default();
        tracing::info!(target: "egrun.host", path = %path.display(), "running project");

        self.project_mut()?
            .run()
            .await
            .map_err(|e| RunError::HostRun {
                path,
                message: e.to_string(),
            })?;

        self.state = SessionState::Executed;
        Ok(())
    }

    pub async fn persist(&mut self, target: &Path) -> Result<(), RunError> {
        self.expect_state(SessionState::Executed, "persist")?;
        tracing::info!(target: "egrun.host", target_path = %target.display(), "saving project");

        self.project_mut()?
            .save_as(target)
            .await
            .map_err(|e| RunError::HostSave {
                target: target.to_path_buf(),
                message: e.to_string(),
            })?;

        self.state = SessionState::Persisted;
        Ok(())
    }

    /// Best-effort release of the open project. Errors are logged only.
    pub async fn close(&mut self) {
        if let Some(mut project) = self.project.take() {
            if let Err(e) = project.close().await {
                tracing::warn!(
                    target: "egrun.host",
                    error = %e,
                    "closing project failed, continuing"
                );
            }
        }
        self.state = SessionState::Closed;
    }

    fn project_mut(&mut self) -> Result<&mut Box<dyn HostProject>, RunError> {
        self.project
            .as_mut()
            .ok_or_else(|| RunError::InvalidState("no project is open".into()))
    }

    fn expect_state(&self, expected: SessionState, action: &str) -> Result<(), RunError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RunError::InvalidState(format!(
                "cannot {action} while session is {}",
                self.state
            )))
        }
    }
}
