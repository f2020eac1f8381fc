use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::AppConfig;

pub const ENV_LOG_LEVEL: &str = "LIFTOFF_LOG_LEVEL";
pub const ENV_EXECUTION_MODE: &str = "LIFTOFF_EXECUTION_MODE";
pub const ENV_STREAM_FORMAT: &str = "LIFTOFF_STREAM_FORMAT";

/// Get the default liftoff data directory: ~/.liftoff
pub fn get_liftoff_data_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".liftoff"))
}

pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = toml::from_str::<AppConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), commands = cfg.commands.len(), "config loaded");
    Ok(cfg)
}

/// Load the manifest from `explicit` when given, else from the first of
/// `./liftoff.toml` and `~/.liftoff/config.toml` that exists, else defaults.
/// Environment overrides are applied last.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut cfg = match explicit {
        Some(path) => load_from_path(path)?,
        None => match default_candidates().into_iter().find(|p| p.exists()) {
            Some(path) => load_from_path(&path)?,
            None => AppConfig::default(),
        },
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

pub fn load_default() -> Result<AppConfig, ConfigError> {
    load(None)
}

fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("liftoff.toml")];
    if let Some(dir) = get_liftoff_data_dir() {
        candidates.push(dir.join("config.toml"));
    }
    candidates
}

/// Apply `LIFTOFF_*` overrides. Blank values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = var(ENV_LOG_LEVEL) {
        cfg.logging.level = v.trim().to_string();
    }
    if let Some(v) = var(ENV_EXECUTION_MODE) {
        cfg.execution.mode = v.parse().map_err(|value| ConfigError::InvalidValue {
            key: ENV_EXECUTION_MODE,
            value,
        })?;
    }
    if let Some(v) = var(ENV_STREAM_FORMAT) {
        cfg.execution.stream_format = v.parse().map_err(|value| ConfigError::InvalidValue {
            key: ENV_STREAM_FORMAT,
            value,
        })?;
    }
    Ok(())
}
