//! Manifest parser for loading configuration files.
//!
//! This module handles loading the manifest from YAML files and applying
//! environment variable overrides, with proper precedence and error handling.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::spec::Manifest;
use crate::error::{ConfigError, Result, SwitchcloudError};

/// Environment variable overriding `provider.endpoint`.
pub const ENDPOINT_ENV: &str = "SWITCHCLOUD_ENDPOINT";

/// Environment variable overriding `provider.api_key`.
pub const API_KEY_ENV: &str = "SWITCHCLOUD_API_KEY";

/// Parser for loading the manifest.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads the manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(SwitchcloudError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SwitchcloudError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses the manifest from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Manifest> {
        debug!("Parsing YAML configuration");

        let mut manifest: Manifest = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            SwitchcloudError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        if let (Some(base), Some(path)) = (&self.base_path, &manifest.state.path)
            && Path::new(path).is_relative()
        {
            manifest.state.path = Some(base.join(path).display().to_string());
        }

        debug!(
            "Parsed configuration with {} projects and {} members",
            manifest.projects.len(),
            manifest.members.len()
        );
        Ok(manifest)
    }

    /// Loads the manifest with environment variable overrides.
    ///
    /// `SWITCHCLOUD_ENDPOINT` and `SWITCHCLOUD_API_KEY` take precedence over
    /// the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let mut manifest = self.load_file(path)?;
        apply_env_overrides(&mut manifest, |name| std::env::var(name).ok());
        Ok(manifest)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                SwitchcloudError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Applies environment overrides using the given variable lookup.
pub fn apply_env_overrides(manifest: &mut Manifest, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.is_empty()) {
        debug!("Overriding provider.endpoint from environment");
        manifest.provider.endpoint = endpoint;
    }

    if let Some(api_key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
        debug!("Overriding provider.api_key from environment");
        manifest.provider.api_key = Some(api_key);
    }

    manifest.provider.endpoint = manifest.provider.endpoint.trim_end_matches('/').to_string();
}

/// Default manifest file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["switchcloud.yaml", "switchcloud.yml"];

/// Finds the manifest in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no manifest is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(SwitchcloudError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
