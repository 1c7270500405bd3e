use ::config::{Config, Environment, File, FileFormat};
use crate::models::AppConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "prostokit.yaml";

/// Prefix for structured environment overrides, e.g. `PROSTOKIT_API__BASE_URL`
pub const ENV_PREFIX: &str = "PROSTOKIT";

/// Single variable selecting the API host, kept for existing deployments
pub const LEGACY_BASE_URL_VAR: &str = "PROSTOKIT_API_BASE_URL";

/// Configuration manager for loading and saving `prostokit.yaml`.
///
/// Sources are layered, later ones winning:
/// 1. Built-in defaults ([`AppConfig::default`])
/// 2. `prostokit.yaml` in the config directory (optional)
/// 3. `PROSTOKIT_*` environment variables, `__` separating nested keys
/// 4. `PROSTOKIT_API_BASE_URL`, when set and non-empty
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing `prostokit.yaml` (created if missing)
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
        })
    }

    /// Load the configuration using the process environment.
    pub fn load(&self) -> Result<AppConfig> {
        self.load_layers(None)
    }

    /// Load the configuration with an explicit set of environment variables
    /// instead of the process environment.
    pub fn load_with_env(&self, vars: HashMap<String, String>) -> Result<AppConfig> {
        self.load_layers(Some(vars))
    }

    fn load_layers(&self, vars: Option<HashMap<String, String>>) -> Result<AppConfig> {
        if self.config_path.exists() {
            tracing::info!("Loading config from {}", self.config_path);
        } else {
            tracing::warn!(
                "Config file not found at {}, using defaults and environment",
                self.config_path
            );
        }

        let legacy_base_url = match &vars {
            Some(vars) => vars.get(LEGACY_BASE_URL_VAR).cloned(),
            None => std::env::var(LEGACY_BASE_URL_VAR).ok(),
        }
        .filter(|url| !url.trim().is_empty());

        let mut builder = Config::builder()
            .add_source(
                File::from(self.config_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            );

        if let Some(url) = legacy_base_url {
            tracing::debug!("Using API base URL from {}", LEGACY_BASE_URL_VAR);
            builder = builder
                .set_override("api.base_url", url)
                .context("Failed to apply API base URL override")?;
        }

        let config: AppConfig = builder
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!(
            "Config loaded: api={}, timeout={}s, flag overrides={}",
            config.api.base_url,
            config.api.request_timeout_secs,
            config.flags.defaults.len()
        );
        Ok(config)
    }

    /// Save the configuration file.
    ///
    /// # Arguments
    /// * `config` - The AppConfig to save
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the configuration file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}
