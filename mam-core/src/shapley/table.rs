//! Channel-combination conversion table

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::config::DEFAULT_PATH_SEPARATOR;
use crate::journey::{Journey, JourneyCollection};

/// Distinct channels of a journey, in key order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Combination(Vec<String>);

impl Combination {
    /// Build a key from channels; unordered keys are sorted
    pub fn new<I, S>(channels: I, order: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut channels: Vec<String> = channels.into_iter().map(Into::into).collect();
        if !order {
            channels.sort();
        }
        Self(channels)
    }

    pub fn channels(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(DEFAULT_PATH_SEPARATOR))
    }
}

/// Combination key of one journey
///
/// Keeps at most `size` distinct channels, preferring those touched most
/// recently. With `order` the key follows first appearance, otherwise it is
/// sorted.
pub fn journey_combination(journey: &Journey, size: usize, order: bool) -> Combination {
    // (first appearance, last appearance) per distinct channel
    let mut seen: Vec<(&str, usize, usize)> = Vec::new();
    for (position, channel) in journey.channels().iter().map(String::as_str).enumerate() {
        match seen.iter().position(|(c, _, _)| *c == channel) {
            Some(index) => seen[index].2 = position,
            None => seen.push((channel, position, position)),
        }
    }

    if seen.len() > size {
        seen.sort_by_key(|&(_, _, last)| std::cmp::Reverse(last));
        seen.truncate(size);
        seen.sort_by_key(|&(_, first, _)| first);
    }

    Combination::new(seen.into_iter().map(|(channel, _, _)| channel), order)
}

/// Aggregates for one channel combination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionRow {
    pub combination: Combination,
    /// Journeys with this combination that converted
    pub conversions: usize,
    /// Journeys with this combination
    pub total_sequences: usize,
    /// Summed credited value of those journeys
    pub conversion_value: f64,
    /// `conversions / total_sequences`
    pub conv_rate: f64,
}

/// Conversion aggregates keyed by combination
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionTable {
    rows: BTreeMap<Combination, ConversionRow>,
}

impl ConversionTable {
    pub fn build(journeys: &JourneyCollection, size: usize, order: bool) -> Self {
        let mut rows: BTreeMap<Combination, ConversionRow> = BTreeMap::new();

        for journey in journeys {
            let combination = journey_combination(journey, size, order);
            let row = rows
                .entry(combination.clone())
                .or_insert_with(|| ConversionRow {
                    combination,
                    conversions: 0,
                    total_sequences: 0,
                    conversion_value: 0.0,
                    conv_rate: 0.0,
                });
            row.total_sequences += 1;
            if journey.converted() {
                row.conversions += 1;
            }
            row.conversion_value += journey.credited_value();
        }

        for row in rows.values_mut() {
            row.conv_rate = row.conversions as f64 / row.total_sequences as f64;
        }

        Self { rows }
    }

    pub fn get(&self, combination: &Combination) -> Option<&ConversionRow> {
        self.rows.get(combination)
    }

    pub fn rows(&self) -> impl Iterator<Item = &ConversionRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
