//! Optional loop configuration file (`taskloop.toml`).
//!
//! Values resolve with precedence CLI flag > config file > built-in default.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::AgentKind;
use crate::io::display::ColorMode;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "taskloop.toml";

/// Loop configuration (TOML). Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    pub agent: AgentKind,
    pub model: Option<String>,
    /// Attempt budget; 0 means unlimited.
    pub max_iterations: u32,
    /// Output lines shown under the status line while an attempt runs.
    pub log_lines: usize,
    pub safe: bool,
    pub color: ColorMode,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            agent: AgentKind::default(),
            model: None,
            max_iterations: 0,
            log_lines: 50,
            safe: false,
            color: ColorMode::default(),
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log_lines == 0 {
            return Err(anyhow!("log_lines must be > 0"));
        }
        if self
            .model
            .as_deref()
            .is_some_and(|model| model.trim().is_empty())
        {
            return Err(anyhow!("model must not be empty"));
        }
        Ok(())
    }

    /// Layer CLI values over this config. `None` keeps the file value.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(agent) = overrides.agent {
            self.agent = agent;
        }
        if let Some(model) = &overrides.model {
            self.model = Some(model.clone());
        }
        if let Some(max_iterations) = overrides.max_iterations {
            self.max_iterations = max_iterations;
        }
        if let Some(log_lines) = overrides.log_lines {
            self.log_lines = log_lines;
        }
        if overrides.safe {
            self.safe = true;
        }
        if let Some(color) = overrides.color {
            self.color = color;
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub agent: Option<AgentKind>,
    pub model: Option<String>,
    pub max_iterations: Option<u32>,
    pub log_lines: Option<usize>,
    /// A switch: it can only turn safe mode on.
    pub safe: bool,
    pub color: Option<ColorMode>,
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LoopConfig::default()`.
pub fn load_config(path: &Path) -> Result<LoopConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(LoopConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LoopConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Resolve the final configuration for a run and validate it.
pub fn resolve_config(path: &Path, overrides: &ConfigOverrides) -> Result<LoopConfig> {
    let mut cfg = load_config(path)?;
    cfg.apply_overrides(overrides);
    cfg.validate()?;
    Ok(cfg)
}
