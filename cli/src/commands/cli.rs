use std::path::PathBuf;

use clap::Parser;

use egrun_core::api::AppConfig;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "egrun",
    version,
    about = "Run Enterprise Guide projects headlessly and check their logs for errors"
)]
pub struct Args {
    /// Project files (.egp) to run, in order.
    #[arg(value_name = "PROJECT", required = true)]
    pub projects: Vec<PathBuf>,

    /// Explicit config file; otherwise ./egrun.toml, then the user config dir.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host profile to activate.
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Automation host version, e.g. 7.1 or 8.1.
    #[arg(long, value_name = "VER")]
    pub host_version: Option<String>,

    /// Save back to the input file instead of a timestamped hidden copy.
    #[arg(long)]
    pub overwrite: bool,

    /// Keep the extracted log directory.
    #[arg(long)]
    pub keep_log: bool,

    /// Echo the extractor's output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Regex (multi-line) that marks a failing log line.
    #[arg(long, value_name = "REGEX")]
    pub error_pattern: Option<String>,

    /// Directory where log directories are materialized.
    #[arg(long, value_name = "DIR")]
    pub log_root: Option<PathBuf>,

    /// Continue with the remaining projects after a failure.
    #[arg(long)]
    pub keep_going: bool,

    /// Print one JSON object per project instead of progress lines.
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Flags win over file and env values; absent flags leave them alone.
    pub fn apply_to(&self, cfg: &mut AppConfig) {
        if let Some(p) = &self.profile {
            cfg.host.profile_name = p.clone();
        }
        if let Some(v) = &self.host_version {
            cfg.host.version = v.clone();
        }
        if self.overwrite {
            cfg.run.overwrite = true;
        }
        if self.keep_log {
            cfg.run.remove_log = false;
        }
        if self.verbose {
            cfg.run.verbose = true;
        }
        if let Some(p) = &self.error_pattern {
            cfg.classifier.error_pattern = p.clone();
        }
        if let Some(d) = &self.log_root {
            cfg.run.log_root = d.clone();
        }
    }
}
