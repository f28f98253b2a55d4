//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.postdeck.toml` files. System construction parameters live here; the
//! aggregator itself never reads configuration.

use crate::system::capabilities::validate_token;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".postdeck.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Registered systems. Order defines each system's index.
    #[serde(default)]
    pub systems: Vec<SystemConfig>,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Per-system deadline for one refresh, in seconds. 0 disables it.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// How merged posts are ordered.
    #[serde(default)]
    pub merge_order: MergeOrder,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            timeout_seconds: default_timeout(),
            merge_order: MergeOrder::default(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Ordering of the merged post list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergeOrder {
    /// Systems in registry order, each system's own order preserved.
    #[default]
    Registry,
    /// Newest first across all systems; ties keep registry order.
    Newest,
}

/// One `[[systems]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SystemConfig {
    /// JSON-over-HTTP backend.
    Http(HttpSystemConfig),
    /// In-process backend seeded from this file.
    Memory(MemorySystemConfig),
}

impl SystemConfig {
    pub fn id(&self) -> &str {
        match self {
            SystemConfig::Http(c) => &c.id,
            SystemConfig::Memory(c) => &c.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SystemConfig::Http(_) => "http",
            SystemConfig::Memory(_) => "memory",
        }
    }

    pub fn capabilities(&self) -> &[String] {
        match self {
            SystemConfig::Http(c) => &c.capabilities,
            SystemConfig::Memory(c) => &c.capabilities,
        }
    }
}

/// Settings for an `http` system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSystemConfig {
    /// Stable identity.
    pub id: String,

    /// Base URL; posts live under `{base_url}/posts`.
    pub base_url: String,

    /// Bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Declared capabilities. Empty means nothing is supported.
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// HTTP client timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

fn default_http_timeout() -> u64 {
    20
}

/// Settings for a `memory` system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySystemConfig {
    /// Stable identity.
    pub id: String,

    /// Declared capabilities. Empty means nothing is supported.
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Author recorded on posts created through this system.
    #[serde(default = "default_author")]
    pub author: String,

    /// Initial posts.
    #[serde(default)]
    pub posts: Vec<SeedPost>,
}

fn default_author() -> String {
    "me".to_string()
}

/// A post preloaded into a memory system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPost {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: String,
    /// RFC 3339 timestamp, quoted in TOML.
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check invariants the system registry depends on.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for (idx, system) in self.systems.iter().enumerate() {
            let id = system.id();
            if id.trim().is_empty() {
                bail!("System #{} has an empty id", idx);
            }
            if !seen.insert(id) {
                bail!("Duplicate system id '{}' (system #{})", id, idx);
            }

            for token in system.capabilities() {
                if let Err(msg) = validate_token(token) {
                    bail!("System '{}': {}", id, msg);
                }
            }

            if let SystemConfig::Http(http) = system {
                if !http.base_url.starts_with("http://") && !http.base_url.starts_with("https://") {
                    bail!(
                        "System '{}': base_url must start with 'http://' or 'https://'",
                        id
                    );
                }
                if http.timeout_seconds == 0 {
                    bail!("System '{}': timeout_seconds must be at least 1", id);
                }
            }
        }

        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(timeout) = args.timeout {
            self.general.timeout_seconds = timeout;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config {
            general: GeneralConfig::default(),
            systems: vec![SystemConfig::Memory(MemorySystemConfig {
                id: "notes".to_string(),
                capabilities: vec![
                    crate::system::LIST_POST.to_string(),
                    crate::system::CREATE_POST.to_string(),
                ],
                author: default_author(),
                posts: Vec::new(),
            })],
        };
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
