use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::options::{DuplicatePolicy, RelatedFileMode};
use crate::DEFAULT_TEMPLATE;

/// Persisted defaults, loaded once at startup and overridden by any CLI
/// flag the user actually passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub template: String,
    pub recursive_default: bool,
    pub duplicate_policy: DuplicatePolicy,
    pub unknown_location_fallback: String,
    pub country_as_code: bool,
    pub related_file_mode: RelatedFileMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            recursive_default: true,
            duplicate_policy: DuplicatePolicy::SkipIdentical,
            unknown_location_fallback: String::new(),
            country_as_code: false,
            related_file_mode: RelatedFileMode::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "photocopy", "photocopy")
        .context("could not determine the platform config directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    if !paths.config_path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(&paths.config_path)
        .with_context(|| format!("could not read config file: {}", paths.config_path.display()))?;

    let config = toml::from_str::<AppConfig>(&raw).context("could not parse config file")?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    fs::create_dir_all(&paths.config_dir).with_context(|| {
        format!(
            "could not create config directory: {}",
            paths.config_dir.display()
        )
    })?;
    let body = toml::to_string_pretty(config).context("could not serialize config")?;
    fs::write(&paths.config_path, body)
        .with_context(|| format!("could not write config file: {}", paths.config_path.display()))?;
    Ok(())
}
