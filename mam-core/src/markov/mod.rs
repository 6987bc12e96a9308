//! Markov removal-effect attribution
//!
//! Journeys are folded into one absorbing Markov chain. A channel's removal
//! effect is the fractional drop in `START -> CONVERSION` absorption when the
//! channel leads straight to `NULL`. Normalized removal effects become channel
//! weights, which are then spread back over every journey's touches.

mod limit;
mod transitions;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{MarkovConfig, ValueMode};
use crate::credit::{ChannelTotals, CreditVector, normalize};
use crate::error::{AttributionError, Result};
use crate::journey::JourneyCollection;

pub use limit::{MatrixLimit, absorption_probability, normalize_rows, power_to_infinity};
pub use transitions::{CONVERSION, NULL, START, TransitionMatrix};

/// Diagnostic outputs of a Markov run
#[derive(Debug, Clone, Serialize)]
pub struct MarkovDiagnostics {
    /// State labels, in matrix order
    pub states: Vec<String>,
    /// Row-normalized transition matrix, one inner vector per row
    pub transition_matrix: Vec<Vec<f64>>,
    /// `START -> CONVERSION` absorption probability of the observed chain
    pub conversion_probability: f64,
    /// Raw removal effect per channel
    pub removal_effects: BTreeMap<String, f64>,
    /// Removal effects normalized to sum to 1
    pub channel_weights: BTreeMap<String, f64>,
    /// Some limit computation fell back to the pseudo-inverse
    pub used_pseudo_inverse: bool,
}

/// Per-journey credits, channel totals and diagnostics of a Markov run
#[derive(Debug, Clone)]
pub struct MarkovOutcome {
    pub credits: Vec<CreditVector>,
    pub channel_totals: ChannelTotals,
    pub diagnostics: MarkovDiagnostics,
}

/// Removal effect of every channel plus the baseline absorption
#[derive(Debug, Clone)]
pub struct RemovalEffects {
    pub conversion_probability: f64,
    pub effects: BTreeMap<String, f64>,
    pub used_pseudo_inverse: bool,
}

/// `1 - counterfactual / baseline` for every channel; 0 when the baseline is 0
pub fn removal_effects(matrix: &TransitionMatrix, tolerance: f64) -> RemovalEffects {
    let (baseline, mut used_pseudo_inverse) = absorption_probability(matrix.weights(), tolerance);

    let mut effects = BTreeMap::new();
    for (offset, channel) in matrix.channels().iter().enumerate() {
        let (counterfactual, pinv) =
            absorption_probability(&matrix.without_channel(offset + 1), tolerance);
        used_pseudo_inverse |= pinv;

        let effect = if baseline <= f64::EPSILON {
            0.0
        } else {
            1.0 - counterfactual / baseline
        };
        effects.insert(channel.clone(), effect);
    }

    RemovalEffects {
        conversion_probability: baseline,
        effects,
        used_pseudo_inverse,
    }
}

fn check_value_mode(journeys: &JourneyCollection, mode: ValueMode) -> Result<()> {
    if mode != ValueMode::Integer {
        return Ok(());
    }
    match journeys
        .iter()
        .position(|j| j.conversion_value().fract() != 0.0)
    {
        Some(index) => Err(AttributionError::config(format!(
            "value mode \"integer\" needs whole-number conversion values, journey {index} has {}",
            journeys.journeys()[index].conversion_value()
        ))),
        None => Ok(()),
    }
}

/// Run the Markov removal-effect model
pub fn attribute(journeys: &JourneyCollection, config: &MarkovConfig) -> Result<MarkovOutcome> {
    config.validate()?;
    check_value_mode(journeys, config.value_mode)?;

    let matrix = TransitionMatrix::from_journeys(journeys, config);
    let removal = removal_effects(&matrix, config.eigen_tolerance);

    let channels: Vec<String> = removal.effects.keys().cloned().collect();
    let effects: Vec<f64> = removal.effects.values().copied().collect();
    let channel_weights: BTreeMap<String, f64> =
        channels.into_iter().zip(normalize(&effects)).collect();

    debug!(
        channels = channel_weights.len(),
        conversion_probability = removal.conversion_probability,
        "Computed removal effects"
    );

    let credits: Vec<CreditVector> = journeys
        .iter()
        .enumerate()
        .map(|(index, journey)| {
            let weights: Vec<f64> = journey
                .channels()
                .iter()
                .map(|channel| channel_weights.get(channel).copied().unwrap_or(0.0))
                .collect();
            let value = journey.credited_value();
            if value > 0.0 && weights.iter().all(|w| *w == 0.0) {
                warn!(journey = index, "Journey channels carry no Markov weight");
            }
            CreditVector::from_weights(&weights, value)
        })
        .collect();

    let total_value = journeys.total_credited_value();
    let channel_totals: ChannelTotals = channel_weights
        .iter()
        .map(|(channel, weight)| (channel.clone(), weight * total_value))
        .collect();

    let normalized = normalize_rows(matrix.weights());
    let transition_matrix = normalized
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();

    Ok(MarkovOutcome {
        credits,
        channel_totals,
        diagnostics: MarkovDiagnostics {
            states: matrix.states().to_vec(),
            transition_matrix,
            conversion_probability: removal.conversion_probability,
            removal_effects: removal.effects,
            channel_weights,
            used_pseudo_inverse: removal.used_pseudo_inverse,
        },
    })
}
