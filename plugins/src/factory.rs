use std::sync::Arc;

use anyhow::Result;

use egrun_core::api::{AppConfig, HostPlugin, LogExtractor, RunOrchestrator};

use crate::extractor::ScriptLogExtractor;

#[cfg(windows)]
pub fn build_host(_cfg: &AppConfig) -> Arc<dyn HostPlugin> {
    Arc::new(crate::host::EnterpriseGuideHost)
}

#[cfg(not(windows))]
pub fn build_host(_cfg: &AppConfig) -> Arc<dyn HostPlugin> {
    Arc::new(crate::host::UnsupportedHost)
}

pub fn build_extractor(cfg: &AppConfig) -> Arc<dyn LogExtractor> {
    Arc::new(ScriptLogExtractor::from_config(&cfg.extractor))
}

pub fn build_orchestrator(cfg: AppConfig) -> Result<RunOrchestrator> {
    let host = build_host(&cfg);
    let extractor = build_extractor(&cfg);
    tracing::debug!(
        target: "egrun.factory",
        host = host.name(),
        extractor = extractor.name(),
        "plugins selected"
    );
    Ok(RunOrchestrator::new(cfg, host, extractor)?)
}
