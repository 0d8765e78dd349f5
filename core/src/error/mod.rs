mod cli_error;
mod config_error;
mod host_error;
mod run_error;

pub use cli_error::CliError;
pub use config_error::ConfigError;
pub use host_error::HostError;
pub use run_error::{HostStep, RunError};
