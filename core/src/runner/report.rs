use std::path::PathBuf;

use serde::Serialize;

use super::naming::PersistedArtifact;

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub project: PathBuf,
    pub artifact: PersistedArtifact,
    pub log_dir: PathBuf,
    pub log_dir_removed: bool,
    /// RFC 3339, local time.
    pub started_at: String,
    /// Wall-clock time from validation through classification.
    pub elapsed_ms: u64,
}
