//! Shapley value attribution
//!
//! Every converting channel combination is treated as a cooperative game
//! whose players are its channels and whose characteristic function reads a
//! column of the conversion table (unseen sub-combinations are worth 0).
//! Combination credit is then sliced back onto the journeys sharing it.

mod coalition;
mod table;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::config::{ShapleyConfig, ShapleyValues};
use crate::credit::{ChannelTotals, CreditVector, normalize};
use crate::error::Result;
use crate::journey::JourneyCollection;

pub use coalition::{coalitions, members, shapley_values};
pub use table::{Combination, ConversionRow, ConversionTable, journey_combination};

/// Credit assigned to the channels of one combination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinationCredit {
    pub combination: Combination,
    /// Aligned with `combination.channels()`
    pub credits: Vec<f64>,
}

impl CombinationCredit {
    pub fn get(&self, channel: &str) -> f64 {
        self.combination
            .channels()
            .iter()
            .position(|c| c == channel)
            .map_or(0.0, |i| self.credits[i])
    }
}

/// Diagnostic outputs of a Shapley run
#[derive(Debug, Clone, Serialize)]
pub struct ShapleyDiagnostics {
    pub conversion_table: Vec<ConversionRow>,
    pub combination_credits: Vec<CombinationCredit>,
}

/// Per-journey credits, channel totals and diagnostics of a Shapley run
#[derive(Debug, Clone)]
pub struct ShapleyOutcome {
    pub credits: Vec<CreditVector>,
    pub channel_totals: ChannelTotals,
    pub diagnostics: ShapleyDiagnostics,
}

/// Characteristic function over combination keys
struct Worth<'a> {
    table: &'a ConversionTable,
    values: ShapleyValues,
    custom: BTreeMap<Combination, f64>,
}

impl<'a> Worth<'a> {
    fn new(table: &'a ConversionTable, config: &ShapleyConfig) -> Self {
        let custom = config
            .custom_values
            .iter()
            .map(|c| {
                (
                    Combination::new(c.combination.iter().cloned(), config.order),
                    c.value,
                )
            })
            .collect();
        Self {
            table,
            values: config.values,
            custom,
        }
    }

    fn of(&self, combination: &Combination) -> f64 {
        let Some(row) = self.table.get(combination) else {
            return 0.0;
        };
        match self.values {
            ShapleyValues::ConvRate => row.conv_rate,
            ShapleyValues::Conversions => row.conversions as f64,
            ShapleyValues::ConversionValue => row.conversion_value,
            ShapleyValues::CustomValue => self.custom.get(combination).copied().unwrap_or(0.0),
        }
    }
}

/// Shapley credit for one converting combination, scaled per the value source
fn combination_credit(row: &ConversionRow, worth: &Worth<'_>, order: bool) -> CombinationCredit {
    let players = row.combination.channels();
    let raw = shapley_values(players.len(), |mask| {
        worth.of(&Combination::new(members(players, mask), order))
    });

    let credits = if worth.values.rescales() {
        let scaled: Vec<f64> = raw
            .iter()
            .map(|v| v * row.total_sequences as f64)
            .collect();
        normalize(&scaled)
            .into_iter()
            .map(|share| share * row.conversion_value)
            .collect()
    } else {
        raw
    };

    CombinationCredit {
        combination: row.combination.clone(),
        credits,
    }
}

/// Run the Shapley model
pub fn attribute(journeys: &JourneyCollection, config: &ShapleyConfig) -> Result<ShapleyOutcome> {
    config.validate()?;

    let table = ConversionTable::build(journeys, config.size, config.order);
    let worth = Worth::new(&table, config);

    let combination_credits: BTreeMap<Combination, CombinationCredit> = table
        .rows()
        .filter(|row| row.conversions > 0)
        .map(|row| {
            (
                row.combination.clone(),
                combination_credit(row, &worth, config.order),
            )
        })
        .collect();

    debug!(
        combinations = table.len(),
        converting = combination_credits.len(),
        values = config.values.as_str(),
        "Computed Shapley values"
    );

    let mut channel_totals = ChannelTotals::new();
    for credit in combination_credits.values() {
        for (channel, value) in credit.combination.channels().iter().zip(&credit.credits) {
            *channel_totals.entry(channel.clone()).or_insert(0.0) += value;
        }
    }

    // Each journey takes its value share of the combination credit, split
    // evenly over repeated touches; channels cut by truncation get nothing
    let credits = journeys
        .iter()
        .map(|journey| {
            let key = journey_combination(journey, config.size, config.order);
            let value = journey.credited_value();
            let (Some(credit), Some(row)) = (combination_credits.get(&key), table.get(&key)) else {
                return CreditVector::zeros(journey.len());
            };
            if value == 0.0 || row.conversion_value == 0.0 {
                return CreditVector::zeros(journey.len());
            }

            let share = value / row.conversion_value;
            let mut touches: BTreeMap<&str, usize> = BTreeMap::new();
            for channel in journey.channels() {
                *touches.entry(channel.as_str()).or_insert(0) += 1;
            }
            CreditVector::new(
                journey
                    .channels()
                    .iter()
                    .map(|channel| {
                        credit.get(channel) * share / touches[channel.as_str()] as f64
                    })
                    .collect(),
            )
        })
        .collect();

    Ok(ShapleyOutcome {
        credits,
        channel_totals,
        diagnostics: ShapleyDiagnostics {
            conversion_table: table.rows().cloned().collect(),
            combination_credits: combination_credits.into_values().collect(),
        },
    })
}
