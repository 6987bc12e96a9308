//! Attribution models and run orchestration
//!
//! Each model is a variant carrying its own settings. `run` dispatches to the
//! matching engine; `Attributor` folds a whole selection into one table.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::ChannelTable;
use crate::config::{
    MarkovConfig, ModelFamily, ModelSelection, PositionWeights, ShapleyConfig, TimeDecayConfig,
};
use crate::credit::{ChannelTotals, CreditVector, channel_totals};
use crate::error::{AttributionError, Result};
use crate::heuristic;
use crate::journey::JourneyCollection;
use crate::markov::{self, MarkovDiagnostics};
use crate::shapley::{self, ShapleyDiagnostics};

/// Stable keys accepted by `ModelSelection::exclude`, in run order
pub const MODEL_KEYS: [&str; 9] = [
    "last_click",
    "last_click_non",
    "first_click",
    "linear",
    "position_based",
    "position_decay",
    "time_decay",
    "shapley",
    "markov",
];

/// One attribution model with its settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributionModel {
    FirstClick,
    LastClick,
    /// Last touch that is not `excluded_channel`
    LastClickNon {
        excluded_channel: String,
    },
    Linear,
    PositionBased(PositionWeights),
    PositionDecay,
    TimeDecay(TimeDecayConfig),
    Markov(MarkovConfig),
    Shapley(ShapleyConfig),
}

impl AttributionModel {
    /// Stable key used for exclusion and lookup
    pub fn key(&self) -> &'static str {
        match self {
            Self::FirstClick => "first_click",
            Self::LastClick => "last_click",
            Self::LastClickNon { .. } => "last_click_non",
            Self::Linear => "linear",
            Self::PositionBased(_) => "position_based",
            Self::PositionDecay => "position_decay",
            Self::TimeDecay(_) => "time_decay",
            Self::Markov(_) => "markov",
            Self::Shapley(_) => "shapley",
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            Self::Markov(_) | Self::Shapley(_) => ModelFamily::Algorithmic,
            _ => ModelFamily::Heuristic,
        }
    }

    /// Column name in the channel table; encodes the settings that change results
    pub fn name(&self) -> String {
        let suffix = self.family().as_str();
        match self {
            Self::FirstClick => format!("attribution_first_click_{suffix}"),
            Self::LastClick => format!("attribution_last_click_{suffix}"),
            Self::LastClickNon { excluded_channel } => {
                format!("attribution_last_click_non_{excluded_channel}_{suffix}")
            }
            Self::Linear => format!("attribution_linear_{suffix}"),
            Self::PositionBased(w) => format!(
                "attribution_position_based_{}_{}_{}_{suffix}",
                w.first, w.middle, w.last
            ),
            Self::PositionDecay => format!("attribution_position_decay_{suffix}"),
            Self::TimeDecay(c) => format!(
                "attribution_time_decay{}_freq{}_{suffix}",
                c.decay_over_time, c.frequency_hours
            ),
            Self::Markov(_) => format!("attribution_markov_{suffix}"),
            Self::Shapley(c) => {
                let order = if c.order { "_order" } else { "" };
                format!(
                    "attribution_shapley_size{}_{}{order}_{suffix}",
                    c.size,
                    c.values.as_str()
                )
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::PositionBased(w) => w.validate(),
            Self::TimeDecay(c) => c.validate(),
            Self::Markov(c) => c.validate(),
            Self::Shapley(c) => c.validate(),
            _ => Ok(()),
        }
    }

    /// Allocate credit over `journeys`
    ///
    /// Time-decay without timing is skipped, not failed.
    pub fn run(&self, journeys: &JourneyCollection) -> Result<ModelRun> {
        self.validate()?;
        let model_name = self.name();
        debug!(model = %model_name, journeys = journeys.len(), "Running attribution model");

        let completed = |credits: Vec<CreditVector>| ModelOutcome {
            channel_totals: channel_totals(journeys, &credits),
            model_name: model_name.clone(),
            credits,
            diagnostics: Diagnostics::None,
        };

        let outcome = match self {
            Self::FirstClick => completed(heuristic::allocate(
                journeys,
                heuristic::first_click_weights,
            )),
            Self::LastClick => completed(heuristic::allocate(
                journeys,
                heuristic::last_click_weights,
            )),
            Self::LastClickNon { excluded_channel } => {
                completed(heuristic::allocate(journeys, |j| {
                    heuristic::last_click_non_weights(j, excluded_channel)
                }))
            }
            Self::Linear => completed(heuristic::allocate(journeys, heuristic::linear_weights)),
            Self::PositionBased(weights) => completed(heuristic::allocate(journeys, |j| {
                heuristic::position_based_weights(j, weights)
            })),
            Self::PositionDecay => completed(heuristic::allocate(
                journeys,
                heuristic::position_decay_weights,
            )),
            Self::TimeDecay(config) => match heuristic::allocate_time_decay(journeys, config) {
                Some(credits) => completed(credits),
                None => {
                    return Ok(ModelRun::Skipped {
                        model_name: model_name.clone(),
                        reason: "journeys carry no inter-touch timing".to_string(),
                    });
                }
            },
            Self::Markov(config) => {
                let outcome = markov::attribute(journeys, config)?;
                ModelOutcome {
                    model_name: model_name.clone(),
                    credits: outcome.credits,
                    channel_totals: outcome.channel_totals,
                    diagnostics: Diagnostics::Markov(outcome.diagnostics),
                }
            }
            Self::Shapley(config) => {
                let outcome = shapley::attribute(journeys, config)?;
                ModelOutcome {
                    model_name: model_name.clone(),
                    credits: outcome.credits,
                    channel_totals: outcome.channel_totals,
                    diagnostics: Diagnostics::Shapley(outcome.diagnostics),
                }
            }
        };

        Ok(ModelRun::Completed(outcome))
    }
}

/// Engine-specific extras attached to an outcome
#[derive(Debug, Clone)]
pub enum Diagnostics {
    None,
    Markov(MarkovDiagnostics),
    Shapley(ShapleyDiagnostics),
}

/// Result of one completed model run
#[derive(Debug, Clone)]
pub struct ModelOutcome {
    pub model_name: String,
    /// One vector per journey, aligned with its channels
    pub credits: Vec<CreditVector>,
    pub channel_totals: ChannelTotals,
    pub diagnostics: Diagnostics,
}

/// A model either ran or was skipped for a recoverable reason
#[derive(Debug, Clone)]
pub enum ModelRun {
    Completed(ModelOutcome),
    Skipped { model_name: String, reason: String },
}

impl ModelSelection {
    /// Enabled models in run order: heuristics, then Shapley, then Markov
    pub fn models(&self) -> Vec<AttributionModel> {
        let all = [
            AttributionModel::LastClick,
            AttributionModel::LastClickNon {
                excluded_channel: self.last_click_non_channel.clone(),
            },
            AttributionModel::FirstClick,
            AttributionModel::Linear,
            AttributionModel::PositionBased(self.position_weights),
            AttributionModel::PositionDecay,
            AttributionModel::TimeDecay(self.time_decay),
            AttributionModel::Shapley(self.shapley.clone()),
            AttributionModel::Markov(self.markov),
        ];

        all.into_iter()
            .filter(|model| self.family.admits(model.family()))
            .filter(|model| !self.exclude.iter().any(|key| key == model.key()))
            .collect()
    }

    /// Reject exclusion keys that name no model
    pub(crate) fn validate_exclusions(&self) -> Result<()> {
        match self
            .exclude
            .iter()
            .find(|key| !MODEL_KEYS.contains(&key.as_str()))
        {
            Some(key) => Err(AttributionError::config(format!(
                "unknown model {key:?} in exclude, expected one of: {}",
                MODEL_KEYS.join(", ")
            ))),
            None => Ok(()),
        }
    }
}

/// Everything produced by running a model selection
#[derive(Debug, Clone, Default)]
pub struct AttributionReport {
    pub table: ChannelTable,
    pub outcomes: Vec<ModelOutcome>,
    /// (model name, reason) of every skipped model
    pub skipped: Vec<(String, String)>,
}

impl AttributionReport {
    pub fn outcome(&self, model_name: &str) -> Option<&ModelOutcome> {
        self.outcomes.iter().find(|o| o.model_name == model_name)
    }
}

/// Runs models over one journey collection and folds them into a table
pub struct Attributor<'a> {
    journeys: &'a JourneyCollection,
}

impl<'a> Attributor<'a> {
    pub fn new(journeys: &'a JourneyCollection) -> Self {
        Self { journeys }
    }

    /// Run one model and fold its totals into `table`
    pub fn run_into(
        &self,
        table: ChannelTable,
        model: &AttributionModel,
    ) -> Result<(ChannelTable, ModelRun)> {
        let run = model.run(self.journeys)?;
        let table = match &run {
            ModelRun::Completed(outcome) => table.merge(&outcome.model_name, &outcome.channel_totals),
            ModelRun::Skipped { .. } => table,
        };
        Ok((table, run))
    }

    /// Run every selected model in order
    ///
    /// The whole selection is validated first, so a bad setting fails before
    /// any model runs.
    pub fn run_all(&self, selection: &ModelSelection) -> Result<AttributionReport> {
        selection.validate()?;
        let models = selection.models();
        for model in &models {
            model.validate()?;
        }

        let mut report = AttributionReport::default();
        for model in &models {
            let (table, run) = self.run_into(std::mem::take(&mut report.table), model)?;
            report.table = table;
            match run {
                ModelRun::Completed(outcome) => report.outcomes.push(outcome),
                ModelRun::Skipped { model_name, reason } => {
                    warn!(model = %model_name, %reason, "Skipped attribution model");
                    report.skipped.push((model_name, reason));
                }
            }
        }

        debug!(
            models = report.outcomes.len(),
            skipped = report.skipped.len(),
            channels = report.table.channel_count(),
            "Attribution run complete"
        );
        Ok(report)
    }
}
