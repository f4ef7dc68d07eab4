// src/config/loader.rs
//! Configuration loader: defaults, TOML files, then environment overrides

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::constants::paths;
use crate::config::FesConfig;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("configuration parse error: {0}")]
    ParseError(String),

    #[error("configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Layers configuration sources in order of precedence
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    required: bool,
}

impl ConfigLoader {
    /// Loader over the default search paths; missing files are skipped
    pub fn new() -> Self {
        Self {
            config_paths: vec![
                PathBuf::from(paths::DEFAULT_CONFIG_FILE),
                PathBuf::from(paths::LOCAL_CONFIG_FILE),
            ],
            required: false,
        }
    }

    /// Loader over custom paths; missing files are skipped
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            required: false,
        }
    }

    /// Loader for one explicitly requested file, which must exist
    pub fn from_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_paths: vec![path.as_ref().to_path_buf()],
            required: true,
        }
    }

    /// Load with overrides from the process environment
    pub fn load(&self) -> Result<FesConfig, ConfigError> {
        self.load_with_overrides(std::env::vars())
    }

    /// Load with overrides from `vars`, `FES_<SECTION>_<KEY>=value`
    pub fn load_with_overrides<I>(&self, vars: I) -> Result<FesConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = toml::Value::try_from(FesConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        for path in &self.config_paths {
            match self.load_config_file(path) {
                Ok(file_config) => {
                    debug!(path = %path.display(), "merging configuration file");
                    merge_toml_values(&mut merged, file_config);
                }
                Err(ConfigError::FileNotFound(_)) if !self.required => continue,
                Err(e) => return Err(e),
            }
        }

        apply_overrides(&mut merged, vars);

        let config: FesConfig = merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError(e.to_string()))?;
        config.validate().map_err(ConfigError::ValidationError)?;

        info!(
            channels = config.channels.len(),
            tick_period_ms = config.session.tick_period_ms,
            device = %config.device.kind,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Write `config` as TOML
    pub fn export_config<P: AsRef<Path>>(config: &FesConfig, path: P) -> Result<(), ConfigError> {
        let toml_content =
            toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_config_file(&self, path: &Path) -> Result<toml::Value, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// `FES_SESSION_TICK_PERIOD_MS=2` sets `session.tick_period_ms`
fn apply_overrides<I>(config: &mut toml::Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(paths::ENV_PREFIX) else {
            continue;
        };
        let rest = rest.to_lowercase();
        let Some((section, field)) = rest.split_once('_') else {
            continue;
        };

        if let Some(toml::Value::Table(table)) = config.get_mut(section) {
            debug!(section, field, "environment override");
            // String fields keep numeric-looking values such as a port named "3"
            let parsed = match table.get(field) {
                Some(toml::Value::String(_)) => toml::Value::String(value),
                _ => parse_env_value(&value),
            };
            table.insert(field.to_string(), parsed);
        }
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}
