//! Configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML file,
//! then `VIZSTEP_`-prefixed environment variables (`__` separates nested keys,
//! e.g. `VIZSTEP_OUTPUT__FORMAT=text`). A `.env` file is loaded first if present.
//!
//! The file is the `--config` path if given, else `VIZSTEP_CONFIG_PATH`, else
//! `./vizstep.toml` when it exists.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_ENV_PREFIX: &str = "VIZSTEP";
const DEFAULT_CONFIG_FILE: &str = "vizstep.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The run outcome as JSON
    Json,
    /// One line per step
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Pretty-print JSON output
    pub pretty: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` env-filter directive; `RUST_LOG` wins when set
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Builder for loading a [`Config`] with overrides
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            config_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }
}

impl ConfigBuilder {
    /// Explicit config file; it must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Prefix for environment overrides
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<Config> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            .set_default("output.format", "json")?
            .set_default("output.pretty", true)?
            .set_default("logging.filter", "warn")?;

        if let Some((path, required)) = self.resolve_file() {
            builder = builder.add_source(config::File::from(path.as_path()).required(required));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// The file to read and whether it has to exist
    fn resolve_file(&self) -> Option<(PathBuf, bool)> {
        if let Some(path) = &self.config_path {
            return Some((path.clone(), true));
        }
        let env_key = format!("{}_CONFIG_PATH", self.env_prefix);
        if let Ok(path) = std::env::var(&env_key) {
            return Some((PathBuf::from(path), true));
        }
        let default = Path::new(DEFAULT_CONFIG_FILE);
        default.exists().then(|| (default.to_path_buf(), false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn unique_prefix() -> String {
        format!("VIZSTEP_TEST_{}", uuid::Uuid::new_v4().simple()).to_uppercase()
    }

    fn write_temp_config(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vizstep-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, contents).expect("Failed to write temp config");
        path
    }

    #[test]
    fn test_defaults() {
        let config = Config::builder()
            .env_prefix(unique_prefix())
            .build()
            .expect("load failed");

        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.pretty);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = write_temp_config(
            r#"
            [output]
            format = "text"

            [logging]
            filter = "debug"
            "#,
        );

        let config = Config::builder()
            .env_prefix(unique_prefix())
            .config_path(Some(path.clone()))
            .build()
            .expect("load failed");
        fs::remove_file(&path).ok();

        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.output.pretty);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn test_env_overrides_file() {
        let prefix = unique_prefix();
        let path = write_temp_config("[output]\npretty = true\n");
        std::env::set_var(format!("{}_OUTPUT__PRETTY", prefix), "false");

        let config = Config::builder()
            .env_prefix(prefix.clone())
            .config_path(Some(path.clone()))
            .build()
            .expect("load failed");
        fs::remove_file(&path).ok();
        std::env::remove_var(format!("{}_OUTPUT__PRETTY", prefix));

        assert!(!config.output.pretty);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::builder()
            .env_prefix(unique_prefix())
            .config_path(Some(PathBuf::from("/definitely/not/here/vizstep.toml")))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::builder()
            .env_prefix(unique_prefix())
            .build()
            .expect("load failed");

        let text = config.to_toml().expect("to_toml failed");
        assert!(text.contains("format = \"json\""));
        let back: Config = toml::from_str(&text).expect("parse failed");
        assert_eq!(back, config);
    }
}
