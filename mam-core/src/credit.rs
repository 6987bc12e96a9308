//! Credit vectors and per-channel totals
//!
//! A credit vector is aligned position by position with a journey's channel
//! list. Values keep full precision; rounding is a presentation concern.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::journey::JourneyCollection;

/// Per-channel summed credit for one model
pub type ChannelTotals = BTreeMap<String, f64>;

/// Credit assigned to each touch of one journey by one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreditVector(Vec<f64>);

impl CreditVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Weights scaled so they sum to `total`; a zero-sum weight vector yields zeros
    pub fn from_weights(weights: &[f64], total: f64) -> Self {
        Self(normalize(weights).into_iter().map(|w| w * total).collect())
    }

    /// All-zero vector of the given length
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Values rounded to `precision` decimals
    pub fn rounded(&self, precision: u32) -> Self {
        Self(self.0.iter().map(|v| round_to(*v, precision)).collect())
    }

    /// Delimiter-joined rendering for tabular export
    pub fn to_delimited(&self, separator: &str, precision: u32) -> String {
        self.0
            .iter()
            .map(|v| round_to(*v, precision).to_string())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl From<Vec<f64>> for CreditVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Decimals beyond this carry no information in an `f64`
pub const MAX_PRECISION: u32 = 15;

/// Round half away from zero to `precision` decimals, capped at `MAX_PRECISION`
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision.min(MAX_PRECISION) as i32);
    (value * factor).round() / factor
}

/// Scale values to sum to 1, treating a zero sum as a divisor of 1
pub(crate) fn normalize(values: &[f64]) -> Vec<f64> {
    let sum: f64 = values.iter().sum();
    let divisor = if sum == 0.0 { 1.0 } else { sum };
    values.iter().map(|v| v / divisor).collect()
}

/// Explode every journey's (channel, credit) pairs and sum by channel
pub fn channel_totals(journeys: &JourneyCollection, credits: &[CreditVector]) -> ChannelTotals {
    let mut totals = ChannelTotals::new();
    for (journey, credit) in journeys.iter().zip(credits) {
        for (channel, value) in journey.channels().iter().zip(credit.values()) {
            *totals.entry(channel.clone()).or_insert(0.0) += value;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::Journey;

    #[test]
    fn test_from_weights_scales_to_total() {
        let credit = CreditVector::from_weights(&[1.0, 1.0, 2.0], 8.0);
        assert_eq!(credit.values(), &[2.0, 2.0, 4.0]);
    }

    #[test]
    fn test_from_weights_zero_sum_yields_zeros() {
        let credit = CreditVector::from_weights(&[0.0, 0.0], 5.0);
        assert_eq!(credit.values(), &[0.0, 0.0]);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.333_333_3, 4), 0.3333);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(1.23456, 2), 1.23);
    }

    #[test]
    fn test_round_to_caps_large_precision() {
        assert_eq!(round_to(1.5, 400), 1.5);
        assert_eq!(round_to(0.25, u32::MAX), 0.25);
        assert!(round_to(1.0 / 3.0, 1_000).is_finite());
    }

    #[test]
    fn test_to_delimited() {
        let credit = CreditVector::new(vec![1.0 / 3.0, 2.0 / 3.0]);
        assert_eq!(credit.to_delimited(" > ", 4), "0.3333 > 0.6667");
    }

    #[test]
    fn test_channel_totals_sums_repeated_channels() {
        let journeys = JourneyCollection::new(vec![
            Journey::new(["A", "B", "A"], true, 3.0),
            Journey::new(["B"], true, 2.0),
        ])
        .unwrap();
        let credits = vec![
            CreditVector::new(vec![1.0, 1.0, 1.0]),
            CreditVector::new(vec![2.0]),
        ];

        let totals = channel_totals(&journeys, &credits);
        assert_eq!(totals.get("A"), Some(&2.0));
        assert_eq!(totals.get("B"), Some(&3.0));
    }
}
