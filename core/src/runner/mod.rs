mod events;
pub mod exit;
mod naming;
mod orchestrator;
mod report;

pub use events::RunEvent;
pub use naming::{error_marked_path, mark_failed, timestamped_sibling, PersistedArtifact, PROJECT_EXTENSION};
pub use orchestrator::RunOrchestrator;
pub use report::RunReport;
