//! Configuration loaded from `impactmap.toml` with per-field defaults.

use crate::core::RiskLevel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImpactConfig {
    #[serde(default)]
    pub call_graph: CallGraphConfig,
    #[serde(default)]
    pub coverage: CoverageConfig,
    /// Glob patterns excluded from the walk, in addition to gitignore rules.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Recently changed files, prioritized when sampling. Typically fed by
    /// the calling shell from its own diff extraction.
    #[serde(default)]
    pub changed_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphConfig {
    /// Disabling short-circuits resolution with an empty graph.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Global wall-clock deadline for the whole resolution step.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Above this count, sampling kicks in.
    #[serde(default = "default_max_symbols")]
    pub max_symbols: usize,
    #[serde(default = "default_sampling_enabled")]
    pub sampling_enabled: bool,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
    /// Cap for one symbol's worth of external-tool queries.
    #[serde(default = "default_per_symbol_timeout_ms")]
    pub per_symbol_timeout_ms: u64,
    /// Probe for external whole-program tools before the built-in resolver.
    #[serde(default = "default_enabled")]
    pub external_tools: bool,
    /// Let probes attempt a one-time `go install` for missing tools.
    #[serde(default)]
    pub install_missing_tools: bool,
}

impl Default for CallGraphConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            deadline_ms: default_deadline_ms(),
            max_symbols: default_max_symbols(),
            sampling_enabled: default_sampling_enabled(),
            sampling_ratio: default_sampling_ratio(),
            per_symbol_timeout_ms: default_per_symbol_timeout_ms(),
            external_tools: default_enabled(),
            install_missing_tools: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Non-exported symbols below this risk are left out of the gap list.
    /// Exported symbols always gap when uncovered.
    #[serde(default)]
    pub min_gap_risk: RiskLevel,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            min_gap_risk: RiskLevel::Low,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_deadline_ms() -> u64 {
    60_000
}

fn default_max_symbols() -> usize {
    500
}

fn default_sampling_enabled() -> bool {
    true
}

fn default_sampling_ratio() -> f64 {
    0.5
}

fn default_per_symbol_timeout_ms() -> u64 {
    5_000
}

const CONFIG_FILE: &str = "impactmap.toml";

impl ImpactConfig {
    /// Load `impactmap.toml` from the target directory, or defaults when
    /// the file does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_budget() {
        let config = ImpactConfig::default();
        assert!(config.call_graph.enabled);
        assert_eq!(config.call_graph.deadline_ms, 60_000);
        assert_eq!(config.call_graph.max_symbols, 500);
        assert_eq!(config.call_graph.sampling_ratio, 0.5);
        assert!(!config.call_graph.install_missing_tools);
        assert_eq!(config.coverage.min_gap_risk, RiskLevel::Low);
    }

    #[test]
    fn partial_toml_keeps_field_defaults() {
        let config: ImpactConfig = toml::from_str(
            r#"
            [call_graph]
            deadline_ms = 1500
            [coverage]
            min_gap_risk = "MEDIUM"
            "#,
        )
        .unwrap();
        assert_eq!(config.call_graph.deadline_ms, 1500);
        assert_eq!(config.call_graph.max_symbols, 500);
        assert_eq!(config.coverage.min_gap_risk, RiskLevel::Medium);
    }
}
