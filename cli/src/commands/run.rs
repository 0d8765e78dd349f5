use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

use egrun_core::api::{
    exit, start_events_out, AppConfig, CliError, OutcomeClassifier, RunError, RunReport,
};
use egrun_core::config;
use egrun_plugins::factory;

use super::cli::Args;
use crate::render::{spawn_renderer, Painter};

/// Config resolved from file, env and flags, plus the file it came from.
#[derive(Debug)]
pub struct LoadedConfig {
    pub cfg: AppConfig,
    pub source: Option<PathBuf>,
}

/// File, then env, then flags. The error pattern is compiled here so a bad
/// regex is reported as a usage error before any host is touched.
pub fn load_config(args: &Args) -> Result<LoadedConfig, CliError> {
    let source = config::locate(args.config.as_deref())?;
    let mut cfg = config::load_from(source.as_deref())?;
    args.apply_to(&mut cfg);
    cfg.validate()?;
    OutcomeClassifier::new(&cfg.classifier)?;
    Ok(LoadedConfig { cfg, source })
}

/// Runs every project in order and returns the process exit code: 0 when all
/// succeeded, otherwise the code of the first failure.
pub async fn run_batch(args: &Args, cfg: AppConfig) -> Result<i32> {
    let events_out = start_events_out(&cfg.events_out)
        .await
        .with_context(|| format!("failed to open events_out at {}", cfg.events_out.path))?;
    let (events_tx, events_handle) = match events_out {
        Some((tx, handle)) => (Some(tx), Some(handle)),
        None => (None, None),
    };

    let mut orchestrator = factory::build_orchestrator(cfg)
        .context("failed to set up runner")?
        .with_events_out(events_tx.clone());

    let renderer = if args.json {
        None
    } else {
        let (tx, handle) = spawn_renderer(Painter::detect());
        orchestrator = orchestrator.with_event_sender(tx);
        Some(handle)
    };

    let mut first_failure: Option<i32> = None;
    for project in &args.projects {
        let result = orchestrator.run_path(project).await;
        if args.json {
            println!("{}", json_line(project, &result));
        }
        if let Err(e) = result {
            first_failure.get_or_insert(e.exit_code());
            if !args.keep_going {
                break;
            }
        }
    }

    drop(orchestrator);
    if let Some(handle) = renderer {
        let _ = handle.await;
    }
    if let Some(tx) = events_tx {
        let dropped = tx.dropped_count();
        if dropped > 0 {
            tracing::warn!(target: "egrun.events_out", dropped, "some run events were not recorded");
        }
    }
    if let Some(handle) = events_handle {
        let _ = handle.await;
    }

    Ok(first_failure.unwrap_or(exit::SUCCESS))
}

fn json_line(project: &std::path::Path, result: &Result<RunReport, RunError>) -> String {
    let value = match result {
        Ok(report) => json!({
            "status": "success",
            "exit_code": exit::SUCCESS,
            "report": report,
        }),
        Err(e) => json!({
            "status": "failed",
            "project": project,
            "kind": e.kind(),
            "exit_code": e.exit_code(),
            "message": e.to_string(),
        }),
    };
    value.to_string()
}
