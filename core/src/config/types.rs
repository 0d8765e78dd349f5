use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PROFILE_NAME: &str = "SAS Asia";
pub const DEFAULT_HOST_VERSION: &str = "7.1";
pub const DEFAULT_ERROR_PATTERN: &str = r"^ERROR.*:";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub events_out: EventsOutConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.profile_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "host.profile_name must not be empty".into(),
            ));
        }
        if self.host.version.trim().is_empty() {
            return Err(ConfigError::Validation(
                "host.version must not be empty".into(),
            ));
        }
        if self.extractor.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "extractor.program must not be empty".into(),
            ));
        }
        if self.events_out.enabled && self.events_out.channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "events_out.channel_capacity must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_profile_name")]
    pub profile_name: String,

    #[serde(default = "default_host_version")]
    pub version: String,
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE_NAME.to_string()
}

fn default_host_version() -> String {
    DEFAULT_HOST_VERSION.to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            profile_name: default_profile_name(),
            version: default_host_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Save back to the input path instead of a timestamped hidden sibling.
    #[serde(default)]
    pub overwrite: bool,

    #[serde(default = "default_remove_log")]
    pub remove_log: bool,

    #[serde(default)]
    pub verbose: bool,

    /// Directory the `<stem>_CodeAndLogs` directories are created in.
    #[serde(default = "default_log_root")]
    pub log_root: PathBuf,
}

fn default_remove_log() -> bool {
    true
}

fn default_log_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            remove_log: default_remove_log(),
            verbose: false,
            log_root: default_log_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_extractor_program")]
    pub program: String,

    /// Arguments placed before the script path.
    #[serde(default = "default_extractor_args")]
    pub args: Vec<String>,

    #[serde(default = "default_extractor_script")]
    pub script: Option<PathBuf>,
}

fn default_extractor_program() -> String {
    "cscript".to_string()
}

fn default_extractor_args() -> Vec<String> {
    vec!["//NoLogo".to_string()]
}

fn default_extractor_script() -> Option<PathBuf> {
    Some(PathBuf::from("ExtractCodeAndLog.vbs"))
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: default_extractor_program(),
            args: default_extractor_args(),
            script: default_extractor_script(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Multi-line regex; the first match in any log marks the run as failed.
    #[serde(default = "default_error_pattern")]
    pub error_pattern: String,

    /// Encoding label tried when a log is neither BOM-marked nor valid UTF-8.
    #[serde(default)]
    pub fallback_encoding: Option<String>,
}

fn default_error_pattern() -> String {
    DEFAULT_ERROR_PATTERN.to_string()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            error_pattern: default_error_pattern(),
            fallback_encoding: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// When set, tracing output goes to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_file_prefix() -> String {
    "egrun.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsOutConfig {
    #[serde(default)]
    pub enabled: bool,

    /// File path, or `stdout:` for standard output.
    #[serde(default = "default_events_out_path")]
    pub path: String,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default)]
    pub drop_when_full: bool,
}

fn default_events_out_path() -> String {
    "egrun.events.jsonl".to_string()
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for EventsOutConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_events_out_path(),
            channel_capacity: default_channel_capacity(),
            drop_when_full: false,
        }
    }
}
