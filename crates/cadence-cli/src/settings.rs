//! Configuration and data-directory resolution

use std::path::{Path, PathBuf};

use anyhow::Context;
use cadence_core::ReviewConfig;
use directories::ProjectDirs;

/// Environment variable naming a review config file
pub const ENV_CONFIG: &str = "CADENCE_CONFIG";

/// Database file name inside a data directory
pub const DB_FILE_NAME: &str = "cadence.db";

/// Config file name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "cadence", "cadence")
}

/// Pick the config file: `--config`, then `CADENCE_CONFIG`, then the
/// platform config directory (only if the file exists there)
pub fn resolve_config_path(flag: Option<&Path>, env_value: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return Some(PathBuf::from(value));
    }
    project_dirs()
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// Load the review config with environment overrides applied
pub fn load_review_config(flag: Option<&Path>) -> anyhow::Result<ReviewConfig> {
    let env_value = std::env::var(ENV_CONFIG).ok();
    let config = match resolve_config_path(flag, env_value.as_deref()) {
        Some(path) => ReviewConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ReviewConfig::default(),
    };
    config
        .with_env_overrides()
        .context("Invalid configuration override in environment")
}

/// Database path for `--data-dir`; `None` lets storage use its default
pub fn db_path(data_dir: Option<&Path>) -> Option<PathBuf> {
    data_dir.map(|dir| dir.join(DB_FILE_NAME))
}
