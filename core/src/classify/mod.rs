//! Pass/fail classification of extracted run logs.
//!
//! Only the first failing line is reported. Logs are visited in glob order
//! (lexical within each directory); callers must not rely on which file wins
//! when several contain errors.

mod decode;

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::config::ClassifierConfig;
use crate::error::{ConfigError, RunError};

pub use decode::{decode_log_bytes, encoding_for_label};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure {
        failing_log_name: String,
        failing_log_path: PathBuf,
        failing_line: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

#[derive(Debug, Clone)]
pub struct OutcomeClassifier {
    pattern: Regex,
    fallback: Option<&'static Encoding>,
}

impl OutcomeClassifier {
    pub fn new(cfg: &ClassifierConfig) -> Result<Self, ConfigError> {
        let fallback = match cfg.fallback_encoding.as_deref() {
            Some(label) => Some(encoding_for_label(label).ok_or_else(|| {
                ConfigError::Validation(format!("unknown fallback encoding '{label}'"))
            })?),
            None => None,
        };
        Ok(Self {
            pattern: build_pattern(&cfg.error_pattern)?,
            fallback,
        })
    }

    pub fn with_pattern(pattern: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            pattern: build_pattern(pattern)?,
            fallback: None,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Text from the first match to the end of its line, without the line break.
    pub fn first_error_line<'t>(&self, text: &'t str) -> Option<&'t str> {
        let m = self.pattern.find(text)?;
        let start = m.start();
        let end = text[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(text.len());
        Some(text[start..end].trim_end_matches('\r'))
    }

    pub fn classify(&self, log_dir: &Path) -> Result<Outcome, RunError> {
        let logs = log_files(log_dir)?;
        if logs.is_empty() {
            tracing::warn!(
                target: "egrun.classify",
                log_dir = %log_dir.display(),
                "no log files found, treating run as successful"
            );
        }

        for log in logs {
            let bytes = std::fs::read(&log)
                .map_err(|e| RunError::io(format!("read log {}", log.display()), e))?;
            let text = decode_log_bytes(&bytes, self.fallback);

            if let Some(line) = self.first_error_line(&text) {
                let name = log
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                tracing::debug!(
                    target: "egrun.classify",
                    log = %log.display(),
                    line,
                    "error marker found"
                );
                return Ok(Outcome::Failure {
                    failing_log_name: name,
                    failing_line: line.to_string(),
                    failing_log_path: log,
                });
            }
        }
        Ok(Outcome::Success)
    }
}

fn build_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|source| ConfigError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Every `*.log` file below `log_dir`, recursively.
pub fn log_files(log_dir: &Path) -> Result<Vec<PathBuf>, RunError> {
    let root = glob::Pattern::escape(&log_dir.to_string_lossy());
    let pattern = format!("{root}/**/*.log");

    let paths = glob::glob(&pattern).map_err(|e| {
        RunError::io(
            format!("invalid log glob {pattern}"),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
        )
    })?;

    let mut out = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| {
            let context = format!("walk log directory {}", e.path().display());
            RunError::io(context, e.into())
        })?;
        if path.is_file() {
            out.push(path);
        }
    }
    Ok(out)
}
