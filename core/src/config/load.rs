use std::path::{Path, PathBuf};

use super::types::AppConfig;
use crate::error::ConfigError;

const LOCAL_CONFIG_FILE: &str = "egrun.toml";

/// An explicit path must exist; the implicit candidates are optional.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_from(locate(explicit)?.as_deref())
}

/// The file `load` would read, or `None` when only defaults apply.
pub fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match explicit {
        Some(p) if !p.exists() => Err(ConfigError::NotFound(p.display().to_string())),
        Some(p) => Ok(Some(p.to_path_buf())),
        None => Ok(implicit_candidates().into_iter().find(|p| p.exists())),
    }
}

/// Reads `source` (or defaults), then applies env overrides and validates.
pub fn load_from(source: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut cfg = match source {
        Some(path) => {
            tracing::debug!(target: "egrun.config", path = %path.display(), "loading config file");
            read_file(path)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    cfg.validate()?;
    Ok(cfg)
}

fn implicit_candidates() -> Vec<PathBuf> {
    let mut out = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        out.push(dir.join("egrun").join("config.toml"));
    }
    out
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str::<AppConfig>(&s).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Blank values are ignored so an exported-but-empty variable keeps the file value.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("EGRUN_PROFILE") {
        cfg.host.profile_name = v;
    }
    if let Some(v) = get("EGRUN_HOST_VERSION") {
        cfg.host.version = v;
    }
    if let Some(v) = get("EGRUN_EXTRACTOR_SCRIPT") {
        cfg.extractor.script = Some(PathBuf::from(v));
    }
    if let Some(v) = get("EGRUN_LOG_FALLBACK_ENCODING") {
        cfg.classifier.fallback_encoding = Some(v);
    }
}
