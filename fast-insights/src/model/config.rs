//! Configuration for model construction and target binarization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InsightError, Result};

/// Default quantile used to split the target into "worse" and "better" rows.
pub const DEFAULT_QUANTILE: f64 = 0.5;

/// Combination arity above which a performance warning is emitted.
pub const DEFAULT_COMBINATION_WARNING_THRESHOLD: usize = 5;

fn default_quantile() -> f64 {
    DEFAULT_QUANTILE
}

/// How the raw target is turned into a binary outcome.
///
/// Rows whose target lies below the pivot are labelled `1` (worse outcome).
///
/// ```rust
/// use fast_insights::model::TargetSpec;
///
/// let spec: TargetSpec = "mean".parse().unwrap();
/// assert_eq!(spec, TargetSpec::Mean);
/// assert!("median".parse::<TargetSpec>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TargetSpec {
    /// Split at the `level`-quantile of the target.
    Quantile {
        #[serde(default = "default_quantile")]
        level: f64,
    },
    /// Split at the arithmetic mean of the target.
    Mean,
    /// The target is already binary (values 0 and 1).
    Binary,
}

impl TargetSpec {
    /// Quantile split at the given level.
    pub fn quantile(level: f64) -> Self {
        Self::Quantile { level }
    }

    /// Short mode name used in derived column names.
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Quantile { .. } => "quantile",
            Self::Mean => "mean",
            Self::Binary => "binary",
        }
    }

    /// Checks the parameters of the spec.
    pub fn validate(&self) -> Result<()> {
        if let Self::Quantile { level } = self {
            if !level.is_finite() || !(0.0..=1.0).contains(level) {
                return Err(InsightError::validation(format!(
                    "quantile level must be a number between 0 and 1, got {level}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self::Quantile {
            level: DEFAULT_QUANTILE,
        }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quantile { level } => write!(f, "quantile({level})"),
            other => f.write_str(other.mode_name()),
        }
    }
}

impl FromStr for TargetSpec {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quantile" => Ok(Self::default()),
            "mean" => Ok(Self::Mean),
            "binary" => Ok(Self::Binary),
            other => Err(InsightError::validation(format!(
                "Unknown target mode '{other}', please use one of the following: \"quantile\", \"mean\", \"binary\""
            ))),
        }
    }
}

/// Configuration for a [`ModelData`](crate::model::ModelData) instance.
///
/// # Examples
///
/// ```rust
/// use fast_insights::model::{ModelConfig, TargetSpec};
///
/// let config = ModelConfig::default()
///     .with_target(TargetSpec::Mean)
///     .with_exclude_zero_variance(false);
/// assert_eq!(config.target, TargetSpec::Mean);
///
/// let parsed = ModelConfig::from_json(r#"{"target": {"mode": "quantile", "level": 0.25}}"#).unwrap();
/// assert_eq!(parsed.target, TargetSpec::quantile(0.25));
/// assert!(parsed.exclude_zero_variance);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Target binarization rule
    pub target: TargetSpec,
    /// Drop categorical columns with < 2 distinct values and constant numeric columns
    pub exclude_zero_variance: bool,
    /// Arity above which `construct_combs_up_to` warns about run time
    pub combination_warning_threshold: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            target: TargetSpec::default(),
            exclude_zero_variance: true,
            combination_warning_threshold: DEFAULT_COMBINATION_WARNING_THRESHOLD,
        }
    }
}

impl ModelConfig {
    /// Configuration for inputs whose target is already binary.
    pub fn binary_target() -> Self {
        Self {
            target: TargetSpec::Binary,
            ..Self::default()
        }
    }

    /// Configuration for inputs that are already free of degenerate columns.
    pub fn prepruned() -> Self {
        Self {
            exclude_zero_variance: false,
            ..Self::default()
        }
    }

    /// Parses a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| InsightError::validation(format!("invalid model configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the target binarization rule.
    pub fn with_target(mut self, target: TargetSpec) -> Self {
        self.target = target;
        self
    }

    /// Sets whether degenerate columns are pruned at construction.
    pub fn with_exclude_zero_variance(mut self, enabled: bool) -> Self {
        self.exclude_zero_variance = enabled;
        self
    }

    /// Sets the combination arity warning threshold.
    pub fn with_combination_warning_threshold(mut self, threshold: usize) -> Self {
        self.combination_warning_threshold = threshold;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.target.validate()
    }
}
