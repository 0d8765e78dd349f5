use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use egrun_core::api::{exit, ExtractOutput, ExtractRequest, ExtractorConfig, LogExtractor, RunError};
use egrun_core::classify::decode_log_bytes;

/// Runs the external extraction script as a one-shot child process:
/// `<program> <args…> [script] <artifact> <host version>`, with the log root
/// as working directory.
#[derive(Debug, Clone)]
pub struct ScriptLogExtractor {
    program: String,
    args: Vec<String>,
    script: Option<PathBuf>,
}

impl ScriptLogExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>, script: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            script,
        }
    }

    /// A relative script is resolved now, since the child runs in the log root.
    pub fn from_config(cfg: &ExtractorConfig) -> Self {
        Self::new(
            cfg.program.clone(),
            cfg.args.clone(),
            cfg.script.as_deref().map(resolve_script),
        )
    }

    pub fn command_args(&self, req: &ExtractRequest<'_>) -> Vec<OsString> {
        let mut out: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        if let Some(script) = &self.script {
            out.push(script.as_os_str().to_owned());
        }
        out.push(req.artifact.as_os_str().to_owned());
        out.push(OsString::from(req.host_version));
        out
    }
}

fn resolve_script(script: &Path) -> PathBuf {
    if script.is_absolute() {
        return script.to_path_buf();
    }
    let from_cwd = std::env::current_dir()
        .map(|d| d.join(script))
        .unwrap_or_else(|_| script.to_path_buf());
    if from_cwd.exists() {
        return from_cwd;
    }
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|d| d.join(script)));
    match beside_exe {
        Some(p) if p.exists() => p,
        _ => from_cwd,
    }
}

#[async_trait]
impl LogExtractor for ScriptLogExtractor {
    fn name(&self) -> &str {
        "script"
    }

    async fn materialize(
        &self,
        req: &ExtractRequest<'_>,
        log_dir: &Path,
    ) -> Result<ExtractOutput, RunError> {
        let args = self.command_args(req);
        tracing::debug!(
            target: "egrun.extract",
            program = %self.program,
            args = ?args,
            cwd = %req.log_root.display(),
            log_dir = %log_dir.display(),
            "spawning log extractor"
        );

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(req.log_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RunError::ExtractorSpawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = decode_log_bytes(&output.stdout, None);
        let stderr = decode_log_bytes(&output.stderr, None);

        if !output.status.success() {
            let code = exit::normalize_exit(output.status);
            tracing::warn!(
                target: "egrun.extract",
                program = %self.program,
                code,
                stderr = %stderr.trim_end(),
                "log extractor failed"
            );
            return Err(RunError::Extraction {
                artifact: req.artifact.to_path_buf(),
                reason: format!("{} exited with code {code}", self.program),
                exit_code: Some(code),
                stdout,
                stderr,
            });
        }

        Ok(ExtractOutput { stdout, stderr })
    }
}
