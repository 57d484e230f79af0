//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section is optional; a missing file yields the built-in defaults. A
//! handful of environment variables (`DEFAULT_PRIVACY_MODE`, `LOG_LEVEL`,
//! `API_HOST`, `API_PORT`) override the file at startup.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::engine::registry::PrivacyRegistry;
use crate::types::{PrivacyLevelConfig, PrivacyMode};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    /// Per-mode overrides of the reference privacy table, keyed by mode name.
    pub modes: BTreeMap<String, PrivacyLevelConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    /// Mode a fresh or reset session starts in.
    pub default_mode: PrivacyMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_mode: PrivacyMode::Normal,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "pge=info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("DEFAULT_PRIVACY_MODE") {
            self.engine.default_mode = mode
                .parse()
                .with_context(|| format!("Invalid DEFAULT_PRIVACY_MODE: {mode}"))?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.filter = format!("pge={}", level.to_lowercase());
        }
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid API_PORT: {port}"))?;
        }
        Ok(())
    }

    /// Build the privacy registry, applying `[modes.*]` overrides.
    pub fn build_registry(&self) -> Result<PrivacyRegistry> {
        let mut overrides = BTreeMap::new();
        for (name, level) in &self.modes {
            let mode: PrivacyMode = name
                .parse()
                .with_context(|| format!("Invalid [modes.{name}] section"))?;
            overrides.insert(mode, *level);
        }
        PrivacyRegistry::with_overrides(&overrides).context("Invalid [modes] configuration")
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
