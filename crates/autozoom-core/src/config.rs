//! User options and the autozoomd config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which fusion algorithm turns metrics into a zoom factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStrategy {
    /// Confidence-weighted mean of all metric values.
    #[default]
    Weighted,
    /// Instant-runoff vote over the preset zoom factors.
    Election,
}

/// Relative weight of each page metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricWeights {
    pub font_size: f64,
    pub margin: f64,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            font_size: 8.0,
            margin: 4.0,
        }
    }
}

/// Options a user can set. Missing fields take their defaults, so a
/// partially stored document is always readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Keep auto-zooming origins the user has overridden.
    pub ignore_overrides: bool,
    /// Font size in px the representative text of a page should appear at.
    pub ideal_font_size: f64,
    /// Fraction of the page width the main centered container should fill.
    pub ideal_page_width: f64,
    pub metric_weights: MetricWeights,
    pub fusion_strategy: FusionStrategy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            ignore_overrides: false,
            ideal_font_size: 16.0,
            ideal_page_width: 1.0,
            metric_weights: MetricWeights::default(),
            fusion_strategy: FusionStrategy::default(),
        }
    }
}

/// autozoomd.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the state database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Options written to the store at startup, replacing stored ones.
    pub options: Option<Options>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/autozoom")
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            options: None,
        }
    }
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
