//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `egrun_core::api` instead of reaching into internal modules.

pub use crate::classify::{Outcome, OutcomeClassifier};
pub use crate::config::{
    AppConfig, ClassifierConfig, EventsOutConfig, ExtractorConfig, HostConfig, LoggingConfig,
    RunConfig,
};
pub use crate::error::{CliError, ConfigError, HostError, RunError};
pub use crate::events_out::{start_events_out, EventsOutTx};
pub use crate::extract::{ExtractOutput, ExtractRequest, ExtractedLogs, LogExtractor};
pub use crate::host::{HostApplication, HostPlugin, HostProject, HostSession};
pub use crate::request::RunRequest;
pub use crate::runner::{exit, PersistedArtifact, RunEvent, RunOrchestrator, RunReport};
