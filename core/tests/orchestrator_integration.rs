//! End-to-end tests of the run state machine against a scripted host and an
//! in-process extractor that writes log files.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use regex::Regex;
use tokio::sync::mpsc;

use egrun_core::api::{
    AppConfig, ExtractOutput, ExtractRequest, HostApplication, HostError, HostPlugin, HostProject,
    LogExtractor, RunError, RunEvent, RunOrchestrator,
};

type Calls = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Default)]
struct HostScript {
    fail_open: bool,
    fail_run: bool,
    fail_save: bool,
    fail_close: bool,
    /// SaveAs reports success without producing a file.
    skip_write: bool,
}

struct FakeHost {
    calls: Calls,
    script: HostScript,
}

struct FakeApp {
    calls: Calls,
    script: HostScript,
}

struct FakeProject {
    calls: Calls,
    script: HostScript,
    source: PathBuf,
}

#[async_trait]
impl HostPlugin for FakeHost {
    fn name(&self) -> &str {
        "fake"
    }

    async fn launch(&self, version: &str) -> Result<Box<dyn HostApplication>, HostError> {
        self.calls.lock().unwrap().push(format!("launch {version}"));
        if version != "7.1" && version != "8.1" {
            return Err(HostError::VersionNotFound {
                version: version.to_string(),
            });
        }
        Ok(Box::new(FakeApp {
            calls: self.calls.clone(),
            script: self.script.clone(),
        }))
    }
}

#[async_trait]
impl HostApplication for FakeApp {
    async fn set_active_profile(&mut self, profile: &str) -> Result<(), HostError> {
        self.calls.lock().unwrap().push(format!("profile {profile}"));
        if profile == "Nowhere" {
            return Err(HostError::ProfileNotFound {
                profile: profile.to_string(),
            });
        }
        Ok(())
    }

    async fn open_project(&mut self, path: &Path) -> Result<Box<dyn HostProject>, HostError> {
        self.calls.lock().unwrap().push("open".into());
        if self.script.fail_open {
            return Err(HostError::call("Open", "incompatible project format"));
        }
        Ok(Box::new(FakeProject {
            calls: self.calls.clone(),
            script: self.script.clone(),
            source: path.to_path_buf(),
        }))
    }
}

#[async_trait]
impl HostProject for FakeProject {
    async fn run(&mut self) -> Result<(), HostError> {
        self.calls.lock().unwrap().push("run".into());
        if self.script.fail_run {
            return Err(HostError::call("Run", "host crashed"));
        }
        Ok(())
    }

    async fn save_as(&mut self, target: &Path) -> Result<(), HostError> {
        self.calls.lock().unwrap().push("save".into());
        if self.script.fail_save {
            return Err(HostError::call("SaveAs", "disk full"));
        }
        if self.script.skip_write {
            return Ok(());
        }
        let bytes = std::fs::read(&self.source).map_err(|e| HostError::call("SaveAs", e.to_string()))?;
        std::fs::write(target, bytes).map_err(|e| HostError::call("SaveAs", e.to_string()))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), HostError> {
        self.calls.lock().unwrap().push("close".into());
        if self.script.fail_close {
            return Err(HostError::call("Close", "already closed"));
        }
        Ok(())
    }
}

/// Writes canned log files, optionally failing like a non-zero exit.
struct FakeExtractor {
    calls: Calls,
    logs: Vec<(&'static str, &'static str)>,
    fail: bool,
}

#[async_trait]
impl LogExtractor for FakeExtractor {
    fn name(&self) -> &str {
        "fake-extractor"
    }

    async fn materialize(
        &self,
        req: &ExtractRequest<'_>,
        log_dir: &Path,
    ) -> Result<ExtractOutput, RunError> {
        self.calls.lock().unwrap().push(format!(
            "extract {} {}",
            req.artifact.file_name().unwrap().to_string_lossy(),
            req.host_version
        ));
        if self.fail {
            return Err(RunError::Extraction {
                artifact: req.artifact.to_path_buf(),
                reason: "extractor exited with status 1".into(),
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "cannot read project".into(),
            });
        }
        for (rel, body) in &self.logs {
            let path = log_dir.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }
        std::fs::create_dir_all(log_dir).unwrap();
        Ok(ExtractOutput {
            stdout: "extracted".into(),
            stderr: String::new(),
        })
    }
}

struct Fixture {
    dir: tempfile::TempDir,
    calls: Calls,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn project(&self, name: &str) -> PathBuf {
        let p = self.dir.path().join(name);
        std::fs::write(&p, b"egp-bytes").unwrap();
        p
    }

    fn log_root(&self) -> PathBuf {
        let root = self.dir.path().join("work");
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    fn config(&self, overwrite: bool, remove_log: bool) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.host.profile_name = "My Server".into();
        cfg.run.overwrite = overwrite;
        cfg.run.remove_log = remove_log;
        cfg.run.log_root = self.log_root();
        cfg
    }

    fn orchestrator(
        &self,
        cfg: AppConfig,
        script: HostScript,
        logs: Vec<(&'static str, &'static str)>,
        extract_fails: bool,
    ) -> RunOrchestrator {
        let host = Arc::new(FakeHost {
            calls: self.calls.clone(),
            script,
        });
        let extractor = Arc::new(FakeExtractor {
            calls: self.calls.clone(),
            logs,
            fail: extract_fails,
        });
        RunOrchestrator::new(cfg, host, extractor).unwrap()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".egp"))
            .collect();
        names.sort();
        names
    }
}

const CLEAN_LOG: &str = "NOTE: The data set WORK.A has 3 observations.\nNOTE: DATA statement used\n";
const FAILING_LOG: &str = "NOTE: start\nERROR: division by zero at step 3\nNOTE: end\n";

#[tokio::test]
async fn success_with_overwrite_keeps_input_name_and_removes_logs() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let orch = fx.orchestrator(
        fx.config(true, true),
        HostScript::default(),
        vec![("Process Flow/Program.log", CLEAN_LOG)],
        false,
    );

    let report = orch.run_path(&project).await.unwrap();

    assert_eq!(report.artifact.path, std::path::absolute(&project).unwrap());
    assert!(report.artifact.is_overwrite);
    assert!(report.log_dir_removed);
    assert!(!report.log_dir.exists());
    assert_eq!(report.log_dir, fx.log_root().join("report_CodeAndLogs"));
    assert_eq!(fx.file_names(), vec!["report.egp"]);
    assert_eq!(
        fx.calls(),
        vec![
            "launch 7.1",
            "profile My Server",
            "open",
            "run",
            "save",
            "close",
            "extract report.egp 7.1",
        ]
    );
}

#[tokio::test]
async fn success_without_remove_log_keeps_log_directory() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let orch = fx.orchestrator(
        fx.config(true, false),
        HostScript::default(),
        vec![("Program.log", CLEAN_LOG)],
        false,
    );

    let report = orch.run_path(&project).await.unwrap();
    assert!(!report.log_dir_removed);
    assert!(report.log_dir.join("Program.log").is_file());
}

#[tokio::test]
async fn failure_renames_timestamped_artifact_and_reports_line() {
    let fx = Fixture::new();
    let project = fx.project("broken.egp");
    let orch = fx.orchestrator(
        fx.config(false, true),
        HostScript::default(),
        vec![("flow/Step3.log", FAILING_LOG)],
        false,
    );

    let err = orch.run_path(&project).await.unwrap_err();
    let (artifact, log_name, line) = match err {
        RunError::DomainRunFailure {
            artifact,
            log_name,
            line,
        } => (artifact, log_name, line),
        other => panic!("unexpected error: {other:?}"),
    };

    assert_eq!(line, "ERROR: division by zero at step 3");
    assert_eq!(log_name, "Step3");
    assert!(artifact.is_file());

    let name = artifact.file_name().unwrap().to_string_lossy().into_owned();
    let re = Regex::new(r"^\.broken_\d{8}-\d{4}\.ERROR\.egp$").unwrap();
    assert!(re.is_match(&name), "unexpected artifact name {name}");

    // input untouched, only the error-marked copy remains next to it
    assert_eq!(fx.file_names(), vec![name.clone(), "broken.egp".to_string()]);
    let log_dirs: Vec<_> = std::fs::read_dir(fx.log_root()).unwrap().collect();
    assert!(log_dirs.is_empty());
}

#[tokio::test]
async fn failure_rename_happens_when_logs_are_kept() {
    let fx = Fixture::new();
    let project = fx.project("broken.egp");
    let orch = fx.orchestrator(
        fx.config(true, false),
        HostScript::default(),
        vec![("a.log", CLEAN_LOG), ("b.log", "ERROR 22-232: Syntax error.\n")],
        false,
    );

    let err = orch.run_path(&project).await.unwrap_err();
    assert!(matches!(err, RunError::DomainRunFailure { ref line, .. } if line == "ERROR 22-232: Syntax error."));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(fx.file_names(), vec!["broken.ERROR.egp"]);
    assert!(fx.log_root().join("broken_CodeAndLogs").join("b.log").is_file());
}

#[tokio::test]
async fn failure_survives_unmarkable_artifact_and_still_removes_logs() {
    let fx = Fixture::new();
    let project = fx.project("broken.egp");
    let script = HostScript {
        skip_write: true,
        ..Default::default()
    };
    let orch = fx.orchestrator(
        fx.config(false, true),
        script,
        vec![("Program.log", "ERROR: boom\n")],
        false,
    );

    let err = orch.run_path(&project).await.unwrap_err();
    let artifact = match &err {
        RunError::DomainRunFailure {
            artifact,
            log_name,
            line,
        } => {
            assert_eq!(log_name, "Program");
            assert_eq!(line, "ERROR: boom");
            artifact.clone()
        }
        other => panic!("unexpected error: {other:?}"),
    };
    assert_eq!(err.exit_code(), 1);

    // nothing to rename, so the planned path is reported as-is
    let name = artifact.file_name().unwrap().to_string_lossy().into_owned();
    assert!(!name.contains(".ERROR."), "unexpected artifact name {name}");
    assert_eq!(fx.file_names(), vec!["broken.egp"]);
    let log_dirs: Vec<_> = std::fs::read_dir(fx.log_root()).unwrap().collect();
    assert!(log_dirs.is_empty());
}

#[tokio::test]
async fn missing_input_never_launches_host() {
    let fx = Fixture::new();
    let orch = fx.orchestrator(fx.config(false, true), HostScript::default(), vec![], false);

    let err = orch
        .run_path(fx.dir.path().join("absent.egp"))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::InputNotFound { .. }));
    assert!(fx.calls().is_empty());
}

#[tokio::test]
async fn unknown_host_version_stops_before_profile_activation() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let mut cfg = fx.config(false, true);
    cfg.host.version = "99.0".into();
    let orch = fx.orchestrator(cfg, HostScript::default(), vec![], false);

    let err = orch.run_path(&project).await.unwrap_err();
    assert!(matches!(err, RunError::HostVersionNotFound { ref version } if version == "99.0"));
    assert_eq!(fx.calls(), vec!["launch 99.0"]);
}

#[tokio::test]
async fn unknown_profile_is_reported_distinctly() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let mut cfg = fx.config(false, true);
    cfg.host.profile_name = "Nowhere".into();
    let orch = fx.orchestrator(cfg, HostScript::default(), vec![], false);

    let err = orch.run_path(&project).await.unwrap_err();
    assert!(matches!(err, RunError::ProfileNotFound { .. }));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(fx.calls(), vec!["launch 7.1", "profile Nowhere"]);
}

#[tokio::test]
async fn open_failure_is_host_open_error() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let script = HostScript {
        fail_open: true,
        ..Default::default()
    };
    let orch = fx.orchestrator(fx.config(false, true), script, vec![], false);

    let err = orch.run_path(&project).await.unwrap_err();
    assert!(matches!(err, RunError::HostOpen { .. }));
    assert_eq!(fx.calls(), vec!["launch 7.1", "profile My Server", "open"]);
}

#[tokio::test]
async fn run_failure_closes_project_and_skips_extraction() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let script = HostScript {
        fail_run: true,
        ..Default::default()
    };
    let orch = fx.orchestrator(fx.config(false, true), script, vec![], false);

    let err = orch.run_path(&project).await.unwrap_err();
    assert!(matches!(err, RunError::HostRun { .. }));
    assert_eq!(
        fx.calls(),
        vec!["launch 7.1", "profile My Server", "open", "run", "close"]
    );
}

#[tokio::test]
async fn save_failure_is_host_save_error() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let script = HostScript {
        fail_save: true,
        ..Default::default()
    };
    let orch = fx.orchestrator(fx.config(false, true), script, vec![], false);

    let err = orch.run_path(&project).await.unwrap_err();
    assert!(matches!(err, RunError::HostSave { .. }));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(fx.calls().last().map(String::as_str), Some("close"));
}

#[tokio::test]
async fn close_failure_does_not_fail_the_run() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let script = HostScript {
        fail_close: true,
        ..Default::default()
    };
    let orch = fx.orchestrator(
        fx.config(true, true),
        script,
        vec![("a.log", CLEAN_LOG)],
        false,
    );

    assert!(orch.run_path(&project).await.is_ok());
}

#[tokio::test]
async fn extraction_failure_propagates_without_rename() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let orch = fx.orchestrator(fx.config(true, true), HostScript::default(), vec![], true);

    let err = orch.run_path(&project).await.unwrap_err();
    assert!(matches!(err, RunError::Extraction { exit_code: Some(1), .. }));
    assert_eq!(err.exit_code(), 5);
    assert_eq!(fx.file_names(), vec!["report.egp"]);
}

#[tokio::test]
async fn verbose_extraction_failure_surfaces_extractor_output() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let mut cfg = fx.config(true, true);
    cfg.run.verbose = true;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orch = fx
        .orchestrator(cfg, HostScript::default(), vec![], true)
        .with_event_sender(tx);

    assert!(orch.run_path(&project).await.is_err());
    drop(orch);

    let mut stderr_seen = None;
    while let Some(ev) = rx.recv().await {
        if let RunEvent::ExtractorOutput { stderr, .. } = ev {
            stderr_seen = Some(stderr);
        }
    }
    assert_eq!(stderr_seen.as_deref(), Some("cannot read project"));
}

#[tokio::test]
async fn stale_log_directory_is_cleared_before_extraction() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let stale = fx.log_root().join("report_CodeAndLogs");
    std::fs::create_dir_all(&stale).unwrap();
    std::fs::write(stale.join("old.log"), "ERROR: from a previous run\n").unwrap();

    let orch = fx.orchestrator(
        fx.config(true, false),
        HostScript::default(),
        vec![("fresh.log", CLEAN_LOG)],
        false,
    );

    let report = orch.run_path(&project).await.unwrap();
    assert!(!stale.join("old.log").exists());
    assert!(report.log_dir.join("fresh.log").is_file());
}

#[tokio::test]
async fn events_follow_state_order() {
    let fx = Fixture::new();
    let project = fx.project("report.egp");
    let mut cfg = fx.config(true, true);
    cfg.run.verbose = true;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orch = fx
        .orchestrator(cfg, HostScript::default(), vec![("a.log", CLEAN_LOG)], false)
        .with_event_sender(tx);

    orch.run_path(&project).await.unwrap();
    drop(orch);

    let mut kinds = Vec::new();
    while let Some(ev) = rx.recv().await {
        let kind = match ev {
            RunEvent::RunStarted { .. } => "started",
            RunEvent::HostLaunched { .. } => "launched",
            RunEvent::ProfileActivated { .. } => "profile",
            RunEvent::ProjectOpened { .. } => "opened",
            RunEvent::RunFinished => "ran",
            RunEvent::ProjectSaved { .. } => "saved",
            RunEvent::ProjectClosed => "closed",
            RunEvent::LogsExtracted { .. } => "extracted",
            RunEvent::ExtractorOutput { .. } => "output",
            RunEvent::LogsRemoved { .. } => "removed",
            RunEvent::Succeeded { .. } => "succeeded",
            RunEvent::Failed { .. } => "failed",
        };
        kinds.push(kind);
    }
    assert_eq!(
        kinds,
        vec![
            "started",
            "launched",
            "profile",
            "opened",
            "ran",
            "saved",
            "closed",
            "extracted",
            "output",
            "removed",
            "succeeded",
        ]
    );
}

#[tokio::test]
async fn invalid_error_pattern_is_rejected_at_construction() {
    let fx = Fixture::new();
    let mut cfg = fx.config(false, true);
    cfg.classifier.error_pattern = "^ERROR(".into();
    let host = Arc::new(FakeHost {
        calls: fx.calls.clone(),
        script: HostScript::default(),
    });
    let extractor = Arc::new(FakeExtractor {
        calls: fx.calls.clone(),
        logs: vec![],
        fail: false,
    });
    assert!(RunOrchestrator::new(cfg, host, extractor).is_err());
}
