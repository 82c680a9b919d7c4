//! Configuration for balance table generation
//!
//! Defaults reproduce the classic layout: Welch's t-test against the full
//! population, thresholds 0.10/0.05/0.01, three decimals.

use crate::error::{BalanceError, Result};
use crate::label::LabelStyle;
use crate::significance::{TestKind, Thresholds};
use crate::summary::SdConvention;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which values a group is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationMode {
    /// Entire dataset column, tested group included
    #[default]
    Full,
    /// Every row outside the tested group ("group vs rest")
    ExcludeGroup,
}

/// Configuration for summarizing, testing and rendering
///
/// # Example
/// ```
/// use balance_table::BalanceConfig;
///
/// let config = BalanceConfig::default();
/// assert_eq!(config.thresholds.values(), [0.10, 0.05, 0.01]);
/// assert_eq!(config.decimals, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// P-value cut-offs for `*`, `**`, `***`, loosest first
    pub thresholds: Thresholds,

    /// t-test variant used for every group
    pub test: TestKind,

    /// Population each group is compared against
    pub population: PopulationMode,

    /// Standard deviation convention for group cells
    pub group_sd: SdConvention,

    /// Standard deviation convention for the "all data" cell
    ///
    /// Defaults to `Sample`, the dataframe default the classic tables used.
    pub overall_sd: SdConvention,

    /// Decimal places for means and standard deviations
    pub decimals: usize,

    /// Emit an empty row after each covariate block
    pub separator_rows: bool,

    /// Header formatting for composite keys (`None` uses abbreviations)
    pub composite_labels: Option<LabelStyle>,

    /// Header formatting for single-column keys
    pub single_labels: LabelStyle,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            test: TestKind::Welch,
            population: PopulationMode::Full,
            group_sd: SdConvention::Population,
            overall_sd: SdConvention::Sample,
            decimals: 3,
            separator_rows: true,
            composite_labels: None,
            single_labels: LabelStyle::Verbatim,
        }
    }
}

impl BalanceConfig {
    /// Default layout with custom thresholds
    pub fn with_thresholds(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    /// Stricter cut-offs (0.05/0.01/0.001)
    pub fn strict() -> Self {
        Self::with_thresholds(Thresholds([0.05, 0.01, 0.001]))
    }

    /// Looser cut-offs (0.20/0.10/0.05)
    pub fn permissive() -> Self {
        Self::with_thresholds(Thresholds([0.20, 0.10, 0.05]))
    }

    /// Label style for a key of the given shape
    pub fn label_style(&self, composite: bool) -> LabelStyle {
        if composite {
            self.composite_labels
                .clone()
                .unwrap_or_else(LabelStyle::composite_default)
        } else {
            self.single_labels.clone()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;

        if self.decimals > 12 {
            return Err(BalanceError::InvalidConfig(format!(
                "decimals must be <= 12, got {}",
                self.decimals
            )));
        }

        for style in [Some(&self.single_labels), self.composite_labels.as_ref()]
            .into_iter()
            .flatten()
        {
            let width = match style {
                LabelStyle::Abbreviate { width } => Some(*width),
                LabelStyle::Lookup { width, .. } => *width,
                LabelStyle::Verbatim => None,
            };
            if width == Some(0) {
                return Err(BalanceError::InvalidConfig(
                    "label abbreviation width must be >= 1".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Parse and validate a TOML configuration
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse balance table config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }
}
