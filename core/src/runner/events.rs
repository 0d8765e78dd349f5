use std::path::PathBuf;

use serde::Serialize;

/// Progress events emitted by the orchestrator, one per state transition.
///
/// `core` never prints; the CLI renders these and the events_out sink
/// records them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted { project: PathBuf },
    HostLaunched { version: String },
    ProfileActivated { profile: String },
    ProjectOpened { path: PathBuf },
    RunFinished,
    ProjectSaved { path: PathBuf },
    ProjectClosed,
    LogsExtracted { dir: PathBuf },
    ExtractorOutput { stdout: String, stderr: String },
    LogsRemoved { dir: PathBuf },
    Succeeded { project: PathBuf, elapsed_ms: u64 },
    Failed {
        project: PathBuf,
        kind: &'static str,
        message: String,
    },
}
