// core/src/error/host_error.rs
use thiserror::Error;

/// Failure reported by an automation host adapter.
///
/// Adapters only need to tell the two configuration errors apart from
/// everything else; `HostSession` attaches the step context.
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error("no automation class registered for version {version}")]
    VersionNotFound { version: String },

    #[error("profile '{profile}' does not exist")]
    ProfileNotFound { profile: String },

    #[error("automation host unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("{op} failed: {message}")]
    Call { op: &'static str, message: String },
}

impl HostError {
    pub fn call(op: &'static str, message: impl Into<String>) -> Self {
        HostError::Call {
            op,
            message: message.into(),
        }
    }
}
