use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::error::RunError;

pub const PROJECT_EXTENSION: &str = "egp";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M";
const ERROR_MARKER: &str = "ERROR";

/// Where the host saved the executed project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedArtifact {
    pub path: PathBuf,
    pub derived_from: PathBuf,
    pub is_overwrite: bool,
}

impl PersistedArtifact {
    /// Overwrite keeps the input path; otherwise a hidden timestamped sibling.
    pub fn plan<Tz>(project: &Path, overwrite: bool, at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let path = if overwrite {
            project.to_path_buf()
        } else {
            timestamped_sibling(project, at)
        };
        Self {
            path,
            derived_from: project.to_path_buf(),
            is_overwrite: overwrite,
        }
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<parent>/.<stem>_<YYYYMMDD-HHMM>.egp`. Minute granularity: two runs of the
/// same project within one minute share a name.
pub fn timestamped_sibling<Tz>(project: &Path, at: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let name = format!(
        ".{}_{}.{}",
        stem_of(project),
        at.format(TIMESTAMP_FORMAT),
        PROJECT_EXTENSION
    );
    project.with_file_name(name)
}

/// `<parent>/<stem>.ERROR.egp`
pub fn error_marked_path(artifact: &Path) -> PathBuf {
    artifact.with_file_name(format!(
        "{}.{}.{}",
        stem_of(artifact),
        ERROR_MARKER,
        PROJECT_EXTENSION
    ))
}

/// Renames a failed artifact in place and returns its new path.
pub fn mark_failed(artifact: &Path) -> Result<PathBuf, RunError> {
    let target = error_marked_path(artifact);
    std::fs::rename(artifact, &target).map_err(|e| {
        RunError::io(
            format!(
                "rename {} to {}",
                artifact.display(),
                target.display()
            ),
            e,
        )
    })?;
    tracing::info!(
        target: "egrun.runner",
        from = %artifact.display(),
        to = %target.display(),
        "marked failed artifact"
    );
    Ok(target)
}
