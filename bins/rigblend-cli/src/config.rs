//! CLI configuration.
//!
//! Layered lowest to highest: built-in defaults, a TOML file, `RIGBLEND_*`
//! environment variables, then command-line flags. The file is
//! `--config <path>` when given (and must exist), otherwise
//! `<config dir>/rigblend/rigblend.toml` if present.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use rigblend_solver::SolverConfig;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "RIGBLEND";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Log level filter string (e.g. "warn", "debug", "rigblend_solver=trace").
    pub log_level: String,
    /// Log output format ("text" or "json").
    pub log_format: String,
    /// Decimal places for text output.
    pub precision: usize,
    pub activation_epsilon: f64,
    pub cache_capacity: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        let solver = SolverConfig::default();
        Self {
            log_level: "warn".to_string(),
            log_format: "text".to_string(),
            precision: 6,
            activation_epsilon: solver.activation_epsilon,
            cache_capacity: solver.cache_capacity,
        }
    }
}

impl CliConfig {
    /// Default config file location, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rigblend").join("rigblend.toml"))
    }

    /// Load from file and process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, None)
    }

    /// Load with an explicit environment map in place of the process environment.
    pub fn load_with(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&CliConfig::default()).context("failed to seed config defaults")?,
        );
        match path {
            Some(path) => builder = builder.add_source(File::from(path).required(true)),
            None => {
                if let Some(default) = Self::default_path() {
                    builder = builder.add_source(File::from(default).required(false));
                }
            }
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let config: Self = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        config
            .solver_config()
            .validate()
            .context("invalid solver settings")?;
        Ok(config)
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, log_level: Option<String>, log_format: Option<String>) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }
        if let Some(format) = log_format {
            self.log_format = format;
        }
        self
    }

    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            activation_epsilon: self.activation_epsilon,
            cache_capacity: self.cache_capacity,
        }
    }
}
