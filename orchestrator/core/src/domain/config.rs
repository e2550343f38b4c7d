// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Solver Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing one
// solver run: swarm size, protocol tuning and which driver executes it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::queen::ScanPolicy;

pub const API_VERSION: &str = "abt.queens/v1";
pub const KIND: &str = "SolverConfig";

/// Top-level solver configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfigManifest {
    /// API version (must be "abt.queens/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "SolverConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: SolverSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Content under `spec:`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverSpec {
    /// Number of queen agents, which is also the board size
    #[serde(default = "default_agents")]
    pub agents: usize,

    /// Grid row of queen 0; queen index = row - row_offset
    #[serde(default = "default_row_offset")]
    pub row_offset: usize,

    /// Idle turns the initiator waits before starting a termination round
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold: u32,

    #[serde(default)]
    pub scan_policy: ScanPolicy,

    /// Hard stop for a run that does not converge
    #[serde(default = "default_max_turns")]
    pub max_turns: u64,

    #[serde(default)]
    pub driver: DriverKind,

    /// Seed for the turn-based driver's agent ordering. `None` keeps the
    /// agents in launch order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// Deterministic lock-step turns
    #[default]
    TurnBased,
    /// One tokio task per agent
    Async,
}

impl std::str::FromStr for DriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "turn-based" | "turn_based" => Ok(DriverKind::TurnBased),
            "async" => Ok(DriverKind::Async),
            other => Err(format!(
                "Unknown driver '{}'. Supported: turn-based, async",
                other
            )),
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::TurnBased => f.write_str("turn-based"),
            DriverKind::Async => f.write_str("async"),
        }
    }
}

fn default_agents() -> usize {
    4
}

fn default_row_offset() -> usize {
    1
}

fn default_idle_threshold() -> u32 {
    5
}

fn default_max_turns() -> u64 {
    10_000
}

impl Default for SolverSpec {
    fn default() -> Self {
        Self {
            agents: default_agents(),
            row_offset: default_row_offset(),
            idle_threshold: default_idle_threshold(),
            scan_policy: ScanPolicy::default(),
            max_turns: default_max_turns(),
            driver: DriverKind::default(),
            shuffle_seed: None,
        }
    }
}

impl Default for SolverConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "n-queens".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: SolverSpec::default(),
        }
    }
}

impl SolverConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. ABT_CONFIG_PATH environment variable
    /// 2. ./abt-config.yaml (working directory)
    /// 3. ~/.abt/config.yaml (user home)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ABT_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./abt-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".abt").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::debug!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `ABT_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Override source is injectable so tests never touch the process
    /// environment.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("ABT_IDLE_THRESHOLD") {
            match val.parse::<u32>() {
                Ok(threshold) => {
                    tracing::info!("Environment override: ABT_IDLE_THRESHOLD={}", threshold);
                    self.spec.idle_threshold = threshold;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for ABT_IDLE_THRESHOLD: '{}'. Expected a positive integer. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("ABT_SCAN_POLICY") {
            match val.parse::<ScanPolicy>() {
                Ok(policy) => {
                    tracing::info!("Environment override: ABT_SCAN_POLICY={:?}", policy);
                    self.spec.scan_policy = policy;
                }
                Err(e) => tracing::warn!("Invalid value for ABT_SCAN_POLICY: {}. Ignoring.", e),
            }
        }

        if let Some(val) = lookup("ABT_MAX_TURNS") {
            match val.parse::<u64>() {
                Ok(turns) => {
                    tracing::info!("Environment override: ABT_MAX_TURNS={}", turns);
                    self.spec.max_turns = turns;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for ABT_MAX_TURNS: '{}'. Expected a positive integer. Ignoring.",
                    val
                ),
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.agents == 0 {
            anyhow::bail!("spec.agents must be at least 1");
        }

        if self.spec.idle_threshold == 0 {
            anyhow::bail!("spec.idle_threshold must be at least 1");
        }

        if self.spec.max_turns == 0 {
            anyhow::bail!("spec.max_turns must be at least 1");
        }

        Ok(())
    }
}
