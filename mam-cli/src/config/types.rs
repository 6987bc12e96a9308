use mam_core::{CustomValue, ModelFamily, ShapleyValues, ValueMode};
use serde::Deserialize;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawMamConfig {
    /// Decimals kept when printing results
    pub round_values_to: Option<u32>,

    /// Separator for joined journey paths and credit columns
    pub path_separator: Option<String>,

    #[serde(default)]
    pub models: RawModelsSection,
}

/// Model selection as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawModelsSection {
    pub family: Option<ModelFamily>,
    pub exclude: Option<Vec<String>>,
    pub last_click_non_channel: Option<String>,

    #[serde(default)]
    pub position_weights: RawPositionWeights,

    #[serde(default)]
    pub time_decay: RawTimeDecay,

    #[serde(default)]
    pub markov: RawMarkov,

    #[serde(default)]
    pub shapley: RawShapley,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPositionWeights {
    pub first: Option<f64>,
    pub middle: Option<f64>,
    pub last: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTimeDecay {
    pub decay_over_time: Option<f64>,
    pub frequency_hours: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawMarkov {
    pub transition_to_same_state: Option<bool>,
    pub value_mode: Option<ValueMode>,
    pub eigen_tolerance: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawShapley {
    pub size: Option<usize>,
    pub order: Option<bool>,
    pub values: Option<ShapleyValues>,
    pub custom_values: Option<Vec<CustomValue>>,
}
