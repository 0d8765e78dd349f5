use clap::Parser;

mod commands;
mod logging;
mod render;

use commands::{cli, run};
use egrun_core::api::exit;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    let run::LoadedConfig { cfg, source } = match run::load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("egrun: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let guard = logging::init(&cfg.logging);
    match &source {
        Some(path) => tracing::debug!(target: "egrun.config", path = %path.display(), "config file loaded"),
        None => tracing::debug!(target: "egrun.config", "no config file found, using defaults"),
    }
    tracing::debug!(
        target: "egrun.cli",
        projects = args.projects.len(),
        profile = %cfg.host.profile_name,
        version = %cfg.host.version,
        "starting batch"
    );

    let code = match run::run_batch(&args, cfg).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(target: "egrun.cli", error = %format!("{e:#}"), "batch aborted");
            eprintln!("egrun: {e:#}");
            exit::INTERNAL
        }
    };

    // process::exit skips destructors; flush the log writer first.
    drop(guard);
    std::process::exit(code);
}
