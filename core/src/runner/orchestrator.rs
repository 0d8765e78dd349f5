use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tokio::sync::mpsc;

use crate::classify::{Outcome, OutcomeClassifier};
use crate::config::AppConfig;
use crate::error::{ConfigError, RunError};
use crate::events_out::EventsOutTx;
use crate::extract::{remove_log_dir, ExtractRequest, LogExtractor};
use crate::host::{HostPlugin, HostSession};
use crate::request::RunRequest;

use super::events::RunEvent;
use super::naming::{mark_failed, PersistedArtifact};
use super::report::RunReport;

/// Drives one project at a time through
/// open → profile → open project → run → save → close → extract → classify.
///
/// Steps are strictly sequential and never retried. The first failing step
/// aborts the run with its error; a failing classification renames the saved
/// artifact to `<stem>.ERROR.egp` and returns `DomainRunFailure`.
pub struct RunOrchestrator {
    cfg: AppConfig,
    host: Arc<dyn HostPlugin>,
    extractor: Arc<dyn LogExtractor>,
    classifier: OutcomeClassifier,
    event_tx: Option<mpsc::UnboundedSender<RunEvent>>,
    events_out: Option<EventsOutTx>,
}

impl RunOrchestrator {
    pub fn new(
        cfg: AppConfig,
        host: Arc<dyn HostPlugin>,
        extractor: Arc<dyn LogExtractor>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let classifier = OutcomeClassifier::new(&cfg.classifier)?;
        Ok(Self {
            cfg,
            host,
            extractor,
            classifier,
            event_tx: None,
            events_out: None,
        })
    }

    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn with_events_out(mut self, events_out: Option<EventsOutTx>) -> Self {
        self.events_out = events_out;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    /// Builds a request from the configured defaults and runs it.
    pub async fn run_path(&self, project: impl AsRef<Path>) -> Result<RunReport, RunError> {
        let started = Instant::now();
        let project = project.as_ref();
        match RunRequest::from_config(project, &self.cfg) {
            Ok(request) => self.execute(&request, started).await,
            Err(e) => {
                self.emit_failure(project, &e).await;
                Err(e)
            }
        }
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunReport, RunError> {
        self.execute(request, Instant::now()).await
    }

    async fn execute(&self, request: &RunRequest, started: Instant) -> Result<RunReport, RunError> {
        let result = self.run_steps(request, started).await;
        if let Err(e) = &result {
            self.emit_failure(request.project_path(), e).await;
        }
        result
    }

    async fn run_steps(&self, request: &RunRequest, started: Instant) -> Result<RunReport, RunError> {
        let project = request.project_path();
        let started_at = Local::now();
        self.emit(project, RunEvent::RunStarted {
            project: project.to_path_buf(),
        })
        .await;

        // The file may have vanished since the request was validated.
        if !project.exists() {
            return Err(RunError::InputNotFound {
                path: project.to_path_buf(),
            });
        }

        let mut session = HostSession::open(self.host.as_ref(), request.host_version()).await?;
        self.emit(project, RunEvent::HostLaunched {
            version: request.host_version().to_string(),
        })
        .await;

        session.activate_profile(request.profile_name()).await?;
        self.emit(project, RunEvent::ProfileActivated {
            profile: request.profile_name().to_string(),
        })
        .await;

        session.open_project(project).await?;
        self.emit(project, RunEvent::ProjectOpened {
            path: project.to_path_buf(),
        })
        .await;

        let artifact = match self.execute_and_persist(&mut session, request).await {
            Ok(artifact) => artifact,
            Err(e) => {
                session.close().await;
                return Err(e);
            }
        };
        session.close().await;
        drop(session);
        self.emit(project, RunEvent::ProjectClosed).await;

        let extract_req = ExtractRequest {
            artifact: &artifact.path,
            host_version: request.host_version(),
            log_root: &self.cfg.run.log_root,
        };
        let extracted = match self.extractor.extract(&extract_req).await {
            Ok(extracted) => extracted,
            Err(e) => {
                if let RunError::Extraction { stdout, stderr, .. } = &e {
                    if request.verbose() {
                        self.emit(project, RunEvent::ExtractorOutput {
                            stdout: stdout.clone(),
                            stderr: stderr.clone(),
                        })
                        .await;
                    }
                }
                return Err(e);
            }
        };
        self.emit(project, RunEvent::LogsExtracted {
            dir: extracted.dir.clone(),
        })
        .await;
        if request.verbose() {
            self.emit(project, RunEvent::ExtractorOutput {
                stdout: extracted.output.stdout.clone(),
                stderr: extracted.output.stderr.clone(),
            })
            .await;
        }

        let outcome = self.classifier.classify(&extracted.dir)?;
        let elapsed = started.elapsed();

        match outcome {
            Outcome::Success => {
                let log_dir_removed = if request.remove_log() {
                    remove_log_dir(&extracted.dir)?;
                    self.emit(project, RunEvent::LogsRemoved {
                        dir: extracted.dir.clone(),
                    })
                    .await;
                    true
                } else {
                    false
                };

                let report = RunReport {
                    project: project.to_path_buf(),
                    artifact,
                    log_dir: extracted.dir,
                    log_dir_removed,
                    started_at: started_at.to_rfc3339(),
                    elapsed_ms: elapsed.as_millis() as u64,
                };
                tracing::info!(
                    target: "egrun.runner",
                    project = %project.display(),
                    elapsed_ms = report.elapsed_ms,
                    "run succeeded"
                );
                self.emit(project, RunEvent::Succeeded {
                    project: project.to_path_buf(),
                    elapsed_ms: report.elapsed_ms,
                })
                .await;
                Ok(report)
            }
            Outcome::Failure {
                failing_log_name,
                failing_log_path,
                failing_line,
            } => {
                tracing::warn!(
                    target: "egrun.runner",
                    project = %project.display(),
                    log = %failing_log_path.display(),
                    line = %failing_line,
                    "error marker found in run logs"
                );
                if request.remove_log() {
                    match remove_log_dir(&extracted.dir) {
                        Ok(()) => {
                            self.emit(project, RunEvent::LogsRemoved {
                                dir: extracted.dir.clone(),
                            })
                            .await
                        }
                        Err(e) => tracing::warn!(
                            target: "egrun.runner",
                            error = %e,
                            "log cleanup failed after a failed run"
                        ),
                    }
                }

                // The log verdict stands even when the artifact cannot be marked.
                let marked = match mark_failed(&artifact.path) {
                    Ok(renamed) => renamed,
                    Err(e) => {
                        tracing::warn!(
                            target: "egrun.runner",
                            artifact = %artifact.path.display(),
                            error = %e,
                            "could not mark failed artifact"
                        );
                        artifact.path.clone()
                    }
                };

                Err(RunError::DomainRunFailure {
                    artifact: marked,
                    log_name: failing_log_name,
                    line: failing_line,
                })
            }
        }
    }

    async fn execute_and_persist(
        &self,
        session: &mut HostSession,
        request: &RunRequest,
    ) -> Result<PersistedArtifact, RunError> {
        let project = request.project_path();

        session.run().await?;
        self.emit(project, RunEvent::RunFinished).await;

        let artifact = PersistedArtifact::plan(project, request.overwrite(), &Local::now());
        session.persist(&artifact.path).await?;
        self.emit(project, RunEvent::ProjectSaved {
            path: artifact.path.clone(),
        })
        .await;
        Ok(artifact)
    }

    async fn emit_failure(&self, project: &Path, error: &RunError) {
        tracing::error!(
            target: "egrun.runner",
            project = %project.display(),
            kind = error.kind(),
            error = %error,
            "run failed"
        );
        self.emit(project, RunEvent::Failed {
            project: project.to_path_buf(),
            kind: error.kind(),
            message: error.to_string(),
        })
        .await;
    }

    async fn emit(&self, project: &Path, event: RunEvent) {
        if let Some(out) = &self.events_out {
            out.send_event(project, &event).await;
        }
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}
