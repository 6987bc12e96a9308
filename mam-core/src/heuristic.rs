//! Heuristic allocation models
//!
//! Each model is a pure weighting rule over one journey's touches. Weights sum
//! to 1 and are scaled by the journey's credited value, so converted journeys
//! distribute exactly their conversion value and the rest distribute nothing.

use tracing::warn;

use crate::config::{PositionWeights, TimeDecayConfig};
use crate::credit::{CreditVector, normalize};
use crate::journey::{Journey, JourneyCollection};

/// One-hot vector of `len` with the hot index at `position`; empty when `len` is 0
fn one_hot(len: usize, position: usize) -> Vec<f64> {
    let mut weights = vec![0.0; len];
    if let Some(weight) = weights.get_mut(position) {
        *weight = 1.0;
    }
    weights
}

/// All credit to the first touch
pub fn first_click_weights(journey: &Journey) -> Vec<f64> {
    one_hot(journey.len(), 0)
}

/// All credit to the last touch
pub fn last_click_weights(journey: &Journey) -> Vec<f64> {
    one_hot(journey.len(), journey.len().saturating_sub(1))
}

/// All credit to the last touch that is not `excluded`; falls back to the
/// last touch when every touch is the excluded channel
pub fn last_click_non_weights(journey: &Journey, excluded: &str) -> Vec<f64> {
    let position = journey
        .channels()
        .iter()
        .rposition(|channel| channel != excluded)
        .unwrap_or(journey.len().saturating_sub(1));

    one_hot(journey.len(), position)
}

/// Equal credit to every touch
pub fn linear_weights(journey: &Journey) -> Vec<f64> {
    let n = journey.len();
    vec![1.0 / n as f64; n]
}

/// First and last touches get their configured share, middle touches split the rest
pub fn position_based_weights(journey: &Journey, weights: &PositionWeights) -> Vec<f64> {
    let PositionWeights {
        first,
        middle,
        last,
    } = weights.normalized();

    match journey.len() {
        0 => Vec::new(),
        1 => vec![1.0],
        2 => vec![first + middle / 2.0, last + middle / 2.0],
        n => {
            let mut result = Vec::with_capacity(n);
            result.push(first);
            result.extend(std::iter::repeat_n(middle / (n - 2) as f64, n - 2));
            result.push(last);
            result
        }
    }
}

/// Linearly increasing credit toward the conversion: position i (1-based) ∝ i
pub fn position_decay_weights(journey: &Journey) -> Vec<f64> {
    let ranks: Vec<f64> = (1..=journey.len()).map(|i| i as f64).collect();
    normalize(&ranks)
}

/// Credit ∝ decay^⌊hours / frequency⌋, or `None` without timing
///
/// Exponents are taken relative to the most recent touch, so the largest raw
/// weight is always 1 however long ago the journey happened.
pub fn time_decay_weights(journey: &Journey, config: &TimeDecayConfig) -> Option<Vec<f64>> {
    let periods: Vec<f64> = journey
        .timing()?
        .iter()
        .map(|h| (h / config.frequency_hours).floor())
        .collect();
    let nearest = periods.iter().copied().fold(f64::INFINITY, f64::min);

    let raw: Vec<f64> = periods
        .iter()
        .map(|k| config.decay_over_time.powf(k - nearest))
        .collect();
    Some(normalize(&raw))
}

/// Apply a weighting rule to every journey
pub fn allocate<F>(journeys: &JourneyCollection, weights: F) -> Vec<CreditVector>
where
    F: Fn(&Journey) -> Vec<f64>,
{
    journeys
        .iter()
        .map(|journey| {
            let value = journey.credited_value();
            CreditVector::new(weights(journey).into_iter().map(|w| w * value).collect())
        })
        .collect()
}

/// Time-decay allocation; `None` when any journey lacks timing
pub fn allocate_time_decay(
    journeys: &JourneyCollection,
    config: &TimeDecayConfig,
) -> Option<Vec<CreditVector>> {
    if !journeys.has_timing() {
        warn!("time_till_conv is missing, time decay model will not run");
        return None;
    }

    journeys
        .iter()
        .map(|journey| {
            let value = journey.credited_value();
            time_decay_weights(journey, config)
                .map(|w| CreditVector::new(w.into_iter().map(|w| w * value).collect()))
        })
        .collect()
}
