//! Configuration types for attribution runs.
//!
//! Every model carries its own typed configuration. Values are validated
//! before any journey is touched; an invalid value is a fatal error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AttributionError, Result};

/// Default number of decimals used when presenting results
pub const DEFAULT_ROUND_VALUES_TO: u32 = 4;

/// Default separator for delimiter-joined journey columns
pub const DEFAULT_PATH_SEPARATOR: &str = " > ";

/// Largest coalition size accepted by the Shapley engine.
///
/// Coalition enumeration is 2^n per combination, so the bound trades
/// accuracy on long journeys for predictable run time.
pub const MAX_SHAPLEY_SIZE: usize = 16;

/// Top-level configuration for an attribution run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    /// Decimals kept when presenting results (default: 4)
    pub round_values_to: u32,
    /// Separator for delimiter-joined exports (default: " > ")
    pub path_separator: String,
    /// Which models run and how each is configured
    pub models: ModelSelection,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            round_values_to: DEFAULT_ROUND_VALUES_TO,
            path_separator: DEFAULT_PATH_SEPARATOR.to_string(),
            models: ModelSelection::default(),
        }
    }
}

impl AttributionConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.models.validate()
    }
}

/// Model family filter, mirroring the heuristic/algorithmic split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Run every model
    #[default]
    All,
    /// Rule-based position/time weighting models
    Heuristic,
    /// Data-driven Markov and Shapley models
    Algorithmic,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Heuristic => "heuristic",
            Self::Algorithmic => "algorithmic",
        }
    }

    /// Whether a filter admits a model of family `other`
    pub fn admits(&self, other: ModelFamily) -> bool {
        *self == Self::All || *self == other
    }
}

impl FromStr for ModelFamily {
    type Err = AttributionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "heuristic" => Ok(Self::Heuristic),
            "algorithmic" => Ok(Self::Algorithmic),
            other => Err(AttributionError::config(format!(
                "model family must be one of: all, heuristic, algorithmic (got {other:?})"
            ))),
        }
    }
}

/// Which models run, plus each model's settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSelection {
    /// Family filter (default: all)
    pub family: ModelFamily,
    /// Model keys to skip, e.g. `["time_decay"]`
    pub exclude: Vec<String>,
    /// Channel ignored by last-click-non (default: "Direct")
    pub last_click_non_channel: String,
    /// First/middle/last weights for position-based
    pub position_weights: PositionWeights,
    /// Time-decay settings
    pub time_decay: TimeDecayConfig,
    /// Markov removal-effect settings
    pub markov: MarkovConfig,
    /// Shapley value settings
    pub shapley: ShapleyConfig,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            family: ModelFamily::All,
            exclude: Vec::new(),
            last_click_non_channel: "Direct".to_string(),
            position_weights: PositionWeights::default(),
            time_decay: TimeDecayConfig::default(),
            markov: MarkovConfig::default(),
            shapley: ShapleyConfig::default(),
        }
    }
}

impl ModelSelection {
    pub fn validate(&self) -> Result<()> {
        self.validate_exclusions()?;
        self.position_weights.validate()?;
        self.time_decay.validate()?;
        self.markov.validate()?;
        self.shapley.validate()
    }
}

/// Position-based weights for the first touch, the middle touches and the last touch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionWeights {
    /// Weight of the first touch (default: 0.4)
    pub first: f64,
    /// Weight shared by the middle touches (default: 0.2)
    pub middle: f64,
    /// Weight of the last touch (default: 0.4)
    pub last: f64,
}

impl Default for PositionWeights {
    fn default() -> Self {
        Self {
            first: 0.4,
            middle: 0.2,
            last: 0.4,
        }
    }
}

impl PositionWeights {
    pub fn new(first: f64, middle: f64, last: f64) -> Self {
        Self { first, middle, last }
    }

    pub fn validate(&self) -> Result<()> {
        let weights = [self.first, self.middle, self.last];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AttributionError::config(format!(
                "position weights must be finite and non-negative, got {weights:?}"
            )));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(AttributionError::config(
                "position weights must not all be zero",
            ));
        }
        Ok(())
    }

    /// Weights rescaled to sum to 1
    pub fn normalized(&self) -> Self {
        let sum = self.first + self.middle + self.last;
        Self {
            first: self.first / sum,
            middle: self.middle / sum,
            last: self.last / sum,
        }
    }
}

/// Time-decay settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeDecayConfig {
    /// Fraction of weight kept per elapsed period, in (0, 1) (default: 0.5)
    pub decay_over_time: f64,
    /// Length of one decay period in hours (default: 128)
    pub frequency_hours: f64,
}

impl Default for TimeDecayConfig {
    fn default() -> Self {
        Self {
            decay_over_time: 0.5,
            frequency_hours: 128.0,
        }
    }
}

impl TimeDecayConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.decay_over_time > 0.0 && self.decay_over_time < 1.0) {
            return Err(AttributionError::config(format!(
                "decay_over_time must be in (0, 1), got {}",
                self.decay_over_time
            )));
        }
        if !(self.frequency_hours.is_finite() && self.frequency_hours > 0.0) {
            return Err(AttributionError::config(format!(
                "frequency_hours must be positive, got {}",
                self.frequency_hours
            )));
        }
        Ok(())
    }
}

/// How each journey weighs its transitions in the Markov graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueMode {
    /// Every journey counts once
    #[default]
    Binary,
    /// Whole-number purchase counts; non-converting journeys count once
    Integer,
    /// The conversion value is an occurrence count for the journey
    Frequency,
    /// Monetary value; non-converting journeys count once
    Monetary,
}

impl ValueMode {
    pub const ALL: [ValueMode; 4] = [
        ValueMode::Binary,
        ValueMode::Integer,
        ValueMode::Frequency,
        ValueMode::Monetary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Integer => "integer",
            Self::Frequency => "frequency",
            Self::Monetary => "monetary",
        }
    }
}

impl fmt::Display for ValueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueMode {
    type Err = AttributionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = Self::ALL.iter().map(ValueMode::as_str).collect();
                AttributionError::config(format!(
                    "conversion_value_type must be one of the following: {} (got {s:?})",
                    allowed.join(", ")
                ))
            })
    }
}

/// Markov removal-effect settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkovConfig {
    /// Keep channel self-transitions such as `A -> A` (default: false)
    pub transition_to_same_state: bool,
    /// Transition weighting (default: binary)
    pub value_mode: ValueMode,
    /// Eigenvalue truncation tolerance for the infinite power (default: 0.001)
    pub eigen_tolerance: f64,
}

impl Default for MarkovConfig {
    fn default() -> Self {
        Self {
            transition_to_same_state: false,
            value_mode: ValueMode::Binary,
            eigen_tolerance: 0.001,
        }
    }
}

impl MarkovConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.eigen_tolerance >= 0.0 && self.eigen_tolerance < 0.5) {
            return Err(AttributionError::config(format!(
                "eigen_tolerance must be in [0, 0.5), got {}",
                self.eigen_tolerance
            )));
        }
        Ok(())
    }
}

/// Which conversion-table column feeds the Shapley characteristic function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapleyValues {
    /// Conversion rate; results are rescaled to the combination's value
    #[default]
    ConvRate,
    /// Raw conversion count
    Conversions,
    /// Summed conversion value
    ConversionValue,
    /// Caller-supplied values per combination
    CustomValue,
}

impl ShapleyValues {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConvRate => "conv_rate",
            Self::Conversions => "conversions",
            Self::ConversionValue => "conversion_value",
            Self::CustomValue => "custom_value",
        }
    }

    /// Whether Shapley values are rescaled to the combination's conversion value
    pub fn rescales(&self) -> bool {
        matches!(self, Self::ConvRate)
    }
}

/// Value supplied by the caller for one channel combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomValue {
    /// Channels of the combination, in key order
    pub combination: Vec<String>,
    pub value: f64,
}

/// Shapley value settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapleyConfig {
    /// Max distinct channels per journey; longer journeys keep the most recent (default: 4)
    pub size: usize,
    /// Treat channel combinations as ordered (default: false)
    pub order: bool,
    /// Characteristic function source (default: conv_rate)
    pub values: ShapleyValues,
    /// Table used when `values = "custom_value"`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_values: Vec<CustomValue>,
}

impl Default for ShapleyConfig {
    fn default() -> Self {
        Self {
            size: 4,
            order: false,
            values: ShapleyValues::ConvRate,
            custom_values: Vec::new(),
        }
    }
}

impl ShapleyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 || self.size > MAX_SHAPLEY_SIZE {
            return Err(AttributionError::config(format!(
                "shapley size must be between 1 and {MAX_SHAPLEY_SIZE}, got {}",
                self.size
            )));
        }
        if self.values == ShapleyValues::CustomValue && self.custom_values.is_empty() {
            return Err(AttributionError::config(
                "values = \"custom_value\" requires a custom_values table",
            ));
        }
        if let Some(bad) = self.custom_values.iter().find(|c| !c.value.is_finite()) {
            return Err(AttributionError::config(format!(
                "custom value for {:?} is not finite",
                bad.combination
            )));
        }
        Ok(())
    }
}
