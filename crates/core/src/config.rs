//! Application configuration.
//!
//! Values are layered: built-in defaults, then the optional
//! `gamestore/config.toml` under the user's config directory, then
//! `GAMESTORE_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under the platform config dir that holds `config.toml`.
pub const CONFIG_DIR: &str = "gamestore";
/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
/// Prefix of environment overrides, e.g. `GAMESTORE_API_BASE_URL`.
pub const ENV_PREFIX: &str = "GAMESTORE";

const DEFAULT_CONFIG: &str = r#"# GameStore configuration

# Base URL of the catalog REST backend.
api_base_url = "http://localhost:5000"

# Per-request timeout in seconds.
request_timeout_secs = 10

# Number of games shown in the recommendation strip.
recommendation_count = 3

# Cards visible at once in each age-rating carousel.
carousel_page_size = 5

# Highest quantity selectable on the purchase page.
max_quantity = 10
"#;

/// Runtime settings for the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the catalog backend, without trailing slash.
    pub api_base_url: String,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Size of the recommendation strip.
    pub recommendation_count: usize,
    /// Carousel page size; also the paging step.
    pub carousel_page_size: usize,
    /// Upper bound for the purchase quantity.
    pub max_quantity: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 10,
            recommendation_count: 3,
            carousel_page_size: 5,
            max_quantity: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default config file and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from an explicit file path. The file is optional.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_layers(path.as_ref(), Environment::with_prefix(ENV_PREFIX))
    }

    fn load_layers(path: &Path, environment: Environment) -> Result<Self> {
        let defaults = AppConfig::default();
        let settings = Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("recommendation_count", defaults.recommendation_count as i64)?
            .set_default("carousel_page_size", defaults.carousel_page_size as i64)?
            .set_default("max_quantity", i64::from(defaults.max_quantity))?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(environment)
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        Ok(config.normalized())
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn normalized(mut self) -> Self {
        self.api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
        if self.api_base_url.is_empty() {
            self.api_base_url = DEFAULT_API_BASE_URL.to_string();
        }
        self.carousel_page_size = self.carousel_page_size.max(1);
        self.max_quantity = self.max_quantity.max(1);
        self
    }
}

/// Location of the user's config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write a commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn env(vars: &[(&str, &str)]) -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(
            vars.iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_layers(&dir.path().join("absent.toml"), env(&[]))?;
        assert_eq!(config, AppConfig::default());
        Ok(())
    }

    #[test]
    fn environment_overrides_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_quantity = 3\nrecommendation_count = 4\n")?;

        let config = AppConfig::load_layers(
            &path,
            env(&[
                ("GAMESTORE_MAX_QUANTITY", "7"),
                ("GAMESTORE_API_BASE_URL", "http://env.test/"),
                ("OTHER_MAX_QUANTITY", "99"),
            ]),
        )?;
        assert_eq!(config.max_quantity, 7);
        assert_eq!(config.recommendation_count, 4);
        assert_eq!(config.api_base_url, "http://env.test");
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_base_url = \"http://store.test:8080/\"\ncarousel_page_size = 0\nrecommendation_count = 4\n",
        )?;

        let config = AppConfig::load_layers(&path, env(&[]))?;
        assert_eq!(config.api_base_url, "http://store.test:8080");
        assert_eq!(config.carousel_page_size, 1);
        assert_eq!(config.recommendation_count, 4);
        assert_eq!(config.max_quantity, 10);
        Ok(())
    }

    #[test]
    fn default_file_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path)?;
        assert!(path.is_file());

        let config = AppConfig::load_layers(&path, env(&[]))?;
        assert_eq!(config, AppConfig::default());

        fs::write(&path, "max_quantity = 3\n")?;
        write_default_config(&path)?;
        assert_eq!(AppConfig::load_layers(&path, env(&[]))?.max_quantity, 3);
        Ok(())
    }
}
