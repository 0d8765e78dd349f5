//! Log extraction boundary.
//!
//! The extraction itself is an external process; this module fixes the
//! directory naming and the delete-before-create rule so every implementation
//! shares them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::RunError;

pub const LOG_DIR_SUFFIX: &str = "_CodeAndLogs";

#[derive(Debug, Clone)]
pub struct ExtractRequest<'a> {
    pub artifact: &'a Path,
    pub host_version: &'a str,
    /// Working directory of the extraction; the log directory is created here.
    pub log_root: &'a Path,
}

/// Diagnostic output captured from the extraction process.
#[derive(Debug, Clone, Default)]
pub struct ExtractOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct ExtractedLogs {
    pub dir: PathBuf,
    pub output: ExtractOutput,
}

#[async_trait]
pub trait LogExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Populates `log_dir` with `*.log` files for `req.artifact`.
    async fn materialize(
        &self,
        req: &ExtractRequest<'_>,
        log_dir: &Path,
    ) -> Result<ExtractOutput, RunError>;

    async fn extract(&self, req: &ExtractRequest<'_>) -> Result<ExtractedLogs, RunError> {
        let dir = log_dir_for(req.log_root, req.artifact)?;
        clear_stale_log_dir(&dir)?;

        tracing::info!(
            target: "egrun.extract",
            extractor = self.name(),
            artifact = %req.artifact.display(),
            log_dir = %dir.display(),
            "extracting logs"
        );
        let output = self.materialize(req, &dir).await?;

        if !dir.is_dir() {
            return Err(RunError::Extraction {
                artifact: req.artifact.to_path_buf(),
                reason: format!("log directory was not produced: {}", dir.display()),
                exit_code: None,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(ExtractedLogs { dir, output })
    }
}

/// `<log_root>/<artifact stem>_CodeAndLogs`
pub fn log_dir_for(log_root: &Path, artifact: &Path) -> Result<PathBuf, RunError> {
    let stem = artifact
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| RunError::Extraction {
            artifact: artifact.to_path_buf(),
            reason: "artifact path has no file name".into(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        })?;
    Ok(log_root.join(format!("{stem}{LOG_DIR_SUFFIX}")))
}

pub fn clear_stale_log_dir(dir: &Path) -> Result<(), RunError> {
    if dir.exists() {
        tracing::debug!(target: "egrun.extract", dir = %dir.display(), "removing stale log directory");
        std::fs::remove_dir_all(dir)
            .map_err(|e| RunError::io(format!("remove stale log directory {}", dir.display()), e))?;
    }
    Ok(())
}

/// Recursive delete of a log directory once the run no longer needs it.
pub fn remove_log_dir(dir: &Path) -> Result<(), RunError> {
    std::fs::remove_dir_all(dir)
        .map_err(|e| RunError::io(format!("remove log directory {}", dir.display()), e))
}
