// core/src/error/run_error.rs
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::runner::exit;

/// Host interaction step, used to label generic setup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStep {
    Launch,
    ActivateProfile,
}

impl fmt::Display for HostStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostStep::Launch => f.write_str("launch"),
            HostStep::ActivateProfile => f.write_str("activate profile"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("not found {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("the specified host version {version} cannot be found (check the installed version)")]
    HostVersionNotFound { version: String },

    #[error("the given profile name '{profile}' wasn't found in the host (check the profile name)")]
    ProfileNotFound { profile: String },

    #[error("host {step} failed: {message}")]
    HostSetup { step: HostStep, message: String },

    #[error("host failed to open {}: {message}", path.display())]
    HostOpen { path: PathBuf, message: String },

    #[error("host failed to run {}: {message}", path.display())]
    HostRun { path: PathBuf, message: String },

    #[error("host failed to save {}: {message}", target.display())]
    HostSave { target: PathBuf, message: String },

    #[error("failed to spawn log extractor: {program}")]
    ExtractorSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("log extraction failed for {}: {reason}", artifact.display())]
    Extraction {
        artifact: PathBuf,
        reason: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("[{log_name}] failed in {}: {line}", artifact.display())]
    DomainRunFailure {
        artifact: PathBuf,
        log_name: String,
        line: String,
    },

    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RunError::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code the CLI reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::DomainRunFailure { .. } => exit::RUN_FAILURE,
            RunError::InputNotFound { .. } => exit::USAGE,
            RunError::HostVersionNotFound { .. }
            | RunError::ProfileNotFound { .. }
            | RunError::HostSetup { .. } => exit::HOST_SETUP,
            RunError::HostOpen { .. } | RunError::HostRun { .. } | RunError::HostSave { .. } => {
                exit::HOST_CALL
            }
            RunError::ExtractorSpawn { .. } | RunError::Extraction { .. } => exit::EXTRACTION,
            RunError::InvalidState(_) | RunError::Io { .. } => exit::INTERNAL,
        }
    }

    /// Stable machine-readable kind, used in JSON output and run events.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::InputNotFound { .. } => "input_not_found",
            RunError::HostVersionNotFound { .. } => "host_version_not_found",
            RunError::ProfileNotFound { .. } => "profile_not_found",
            RunError::HostSetup { .. } => "host_setup",
            RunError::HostOpen { .. } => "host_open",
            RunError::HostRun { .. } => "host_run",
            RunError::HostSave { .. } => "host_save",
            RunError::ExtractorSpawn { .. } | RunError::Extraction { .. } => "extraction",
            RunError::DomainRunFailure { .. } => "domain_run_failure",
            RunError::InvalidState(_) => "invalid_state",
            RunError::Io { .. } => "io",
        }
    }
}
