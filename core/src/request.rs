use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::AppConfig;
use crate::error::RunError;

/// One project execution, validated at construction.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    project_path: PathBuf,
    profile_name: String,
    host_version: String,
    overwrite: bool,
    remove_log: bool,
    verbose: bool,
}

impl RunRequest {
    /// Fails with `InputNotFound` when `project_path` does not exist; the stored
    /// path is absolute.
    pub fn new(
        project_path: impl AsRef<Path>,
        profile_name: impl Into<String>,
        host_version: impl Into<String>,
        overwrite: bool,
        remove_log: bool,
        verbose: bool,
    ) -> Result<Self, RunError> {
        let raw = project_path.as_ref();
        if !raw.exists() {
            return Err(RunError::InputNotFound {
                path: raw.to_path_buf(),
            });
        }
        let project_path = std::path::absolute(raw)
            .map_err(|e| RunError::io(format!("resolve {}", raw.display()), e))?;

        Ok(Self {
            project_path,
            profile_name: profile_name.into(),
            host_version: host_version.into(),
            overwrite,
            remove_log,
            verbose,
        })
    }

    pub fn from_config(project_path: impl AsRef<Path>, cfg: &AppConfig) -> Result<Self, RunError> {
        Self::new(
            project_path,
            cfg.host.profile_name.clone(),
            cfg.host.version.clone(),
            cfg.run.overwrite,
            cfg.run.remove_log,
            cfg.run.verbose,
        )
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn remove_log(&self) -> bool {
        self.remove_log
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
