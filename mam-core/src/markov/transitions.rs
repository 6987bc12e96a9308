//! Transition graph built from every journey

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::DMatrix;
use tracing::debug;

use crate::config::{MarkovConfig, ValueMode};
use crate::journey::{Journey, JourneyCollection};

/// Synthetic state every journey starts in
pub const START: &str = "(start)";
/// Absorbing state for journeys that did not convert
pub const NULL: &str = "(null)";
/// Absorbing state for converted journeys
pub const CONVERSION: &str = "(conversion)";

/// Aggregated transition weights over `[START] + sorted(channels) + [NULL, CONVERSION]`
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    states: Vec<String>,
    weights: DMatrix<f64>,
}

/// Weight one journey contributes to each of its transitions
pub(crate) fn journey_weight(journey: &Journey, mode: ValueMode) -> f64 {
    match mode {
        ValueMode::Binary => 1.0,
        ValueMode::Frequency => journey.conversion_value(),
        // Non-converting journeys still count once
        ValueMode::Integer | ValueMode::Monetary => journey.credited_value().max(1.0),
    }
}

impl TransitionMatrix {
    /// Fold every journey's consecutive state pairs into one weight matrix
    pub fn from_journeys(journeys: &JourneyCollection, config: &MarkovConfig) -> Self {
        let mut edges: BTreeMap<(&str, &str), f64> = BTreeMap::new();

        for journey in journeys {
            let weight = journey_weight(journey, config.value_mode);
            let end = if journey.converted() { CONVERSION } else { NULL };
            let path: Vec<&str> = std::iter::once(START)
                .chain(journey.channels().iter().map(String::as_str))
                .chain(std::iter::once(end))
                .collect();

            for pair in path.windows(2) {
                *edges.entry((pair[0], pair[1])).or_insert(0.0) += weight;
            }
        }

        if !config.transition_to_same_state {
            edges.retain(|(from, to), _| from != to);
        }

        let channels: BTreeSet<&str> = edges
            .keys()
            .flat_map(|(from, to)| [*from, *to])
            .filter(|state| ![START, NULL, CONVERSION].contains(state))
            .collect();

        let states: Vec<String> = std::iter::once(START)
            .chain(channels)
            .chain([NULL, CONVERSION])
            .map(str::to_string)
            .collect();
        let index: BTreeMap<&str, usize> = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let n = states.len();
        let mut weights = DMatrix::zeros(n, n);
        for ((from, to), weight) in &edges {
            weights[(index[from], index[to])] = *weight;
        }
        weights[(n - 2, n - 2)] = 1.0;
        weights[(n - 1, n - 1)] = 1.0;

        debug!(states = n, edges = edges.len(), "Built transition matrix");

        Self { states, weights }
    }

    /// State labels in matrix order
    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// Channel labels (states without the synthetic ones)
    pub fn channels(&self) -> &[String] {
        &self.states[1..self.states.len() - 2]
    }

    /// Raw aggregated weights
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    pub fn null_index(&self) -> usize {
        self.states.len() - 2
    }

    /// Copy of the weights where `channel_index`'s outgoing edges all lead to NULL
    pub fn without_channel(&self, channel_index: usize) -> DMatrix<f64> {
        let mut removed = self.weights.clone();
        let outgoing: f64 = removed.row(channel_index).iter().sum();
        removed.row_mut(channel_index).fill(0.0);
        removed[(channel_index, self.null_index())] = outgoing;
        removed
    }
}
