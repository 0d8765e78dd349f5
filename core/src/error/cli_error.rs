// core/src/error/cli_error.rs
use thiserror::Error;

use super::{ConfigError, RunError};
use crate::runner::exit;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Run(#[from] RunError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Run(e) => e.exit_code(),
            CliError::Config(_) => exit::USAGE,
        }
    }
}
