//! Journey collection: the immutable input every model reads
//!
//! A journey is the ordered list of channel touches one customer went through
//! before converting (or not). Collections are validated once on construction
//! and never mutated afterwards; transformations return new collections.

use std::collections::BTreeSet;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::{AttributionError, Result};

/// One customer path to (or without) conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    /// Optional upstream identifier, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    /// Channel labels in chronological touch order
    channels: Vec<String>,
    /// Whether the journey ended in a conversion
    converted: bool,
    /// Value of the conversion; ignored by every model when not converted
    #[serde(default)]
    conversion_value: f64,
    /// Hours from each touch to the conversion (or window end)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inter_touch_hours: Option<Vec<f64>>,
}

impl Journey {
    /// Create a journey without timing data
    pub fn new<I, S>(channels: I, converted: bool, conversion_value: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            channels: channels.into_iter().map(Into::into).collect(),
            converted,
            conversion_value,
            inter_touch_hours: None,
        }
    }

    /// Attach inter-touch timing (hours until conversion, one per touch)
    pub fn with_timing(mut self, hours: Vec<f64>) -> Self {
        self.inter_touch_hours = Some(hours);
        self
    }

    /// Attach an upstream journey identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn converted(&self) -> bool {
        self.converted
    }

    /// Raw conversion value as supplied upstream
    pub fn conversion_value(&self) -> f64 {
        self.conversion_value
    }

    /// Value that credit vectors must sum to: the conversion value when
    /// converted, zero otherwise
    pub fn credited_value(&self) -> f64 {
        if self.converted {
            self.conversion_value
        } else {
            0.0
        }
    }

    pub fn timing(&self) -> Option<&[f64]> {
        self.inter_touch_hours.as_deref()
    }

    /// Number of touches
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channels joined with a separator, e.g. `"Organic > Direct"`
    pub fn path(&self, separator: &str) -> String {
        self.channels.join(separator)
    }

    /// Timing joined with a separator, if present
    pub fn timing_path(&self, separator: &str) -> Option<String> {
        self.timing().map(|hours| {
            hours
                .iter()
                .map(|h| h.to_string())
                .collect::<Vec<_>>()
                .join(separator)
        })
    }

    fn validate(&self, index: usize) -> Result<()> {
        let invalid = |reason: String| AttributionError::InvalidJourney { index, reason };

        if self.channels.is_empty() {
            return Err(invalid("empty channel list".into()));
        }
        if !self.conversion_value.is_finite() || self.conversion_value < 0.0 {
            return Err(invalid(format!(
                "conversion value must be finite and non-negative, got {}",
                self.conversion_value
            )));
        }
        if let Some(hours) = &self.inter_touch_hours {
            if hours.len() != self.channels.len() {
                return Err(invalid(format!(
                    "{} timing entries for {} touches",
                    hours.len(),
                    self.channels.len()
                )));
            }
            if let Some(bad) = hours.iter().find(|h| !h.is_finite() || **h < 0.0) {
                return Err(invalid(format!("invalid inter-touch hours {bad}")));
            }
        }
        Ok(())
    }
}

/// Validated, read-only set of journeys
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JourneyCollection {
    journeys: Vec<Journey>,
}

impl JourneyCollection {
    /// Validate and wrap a list of journeys
    pub fn new(journeys: Vec<Journey>) -> Result<Self> {
        for (index, journey) in journeys.iter().enumerate() {
            journey.validate(index)?;
        }
        Ok(Self { journeys })
    }

    /// Parse a JSON array of journeys
    pub fn from_json_str(json: &str) -> Result<Self> {
        let journeys: Vec<Journey> = serde_json::from_str(json)?;
        Self::new(journeys)
    }

    /// Read a JSON array of journeys
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let journeys: Vec<Journey> = serde_json::from_reader(reader)?;
        Self::new(journeys)
    }

    pub fn journeys(&self) -> &[Journey] {
        &self.journeys
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Journey> {
        self.journeys.iter()
    }

    pub fn len(&self) -> usize {
        self.journeys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journeys.is_empty()
    }

    /// True when every journey carries inter-touch timing
    pub fn has_timing(&self) -> bool {
        self.journeys.iter().all(|j| j.timing().is_some())
    }

    /// Sorted set of every channel label seen
    pub fn channel_vocabulary(&self) -> BTreeSet<&str> {
        self.journeys
            .iter()
            .flat_map(|j| j.channels.iter().map(String::as_str))
            .collect()
    }

    /// Sum of credited value over all journeys
    pub fn total_credited_value(&self) -> f64 {
        self.journeys.iter().map(Journey::credited_value).sum()
    }

    /// Replace touches of `selected` that follow the previous touch by less
    /// than `window_hours` with the previous touch's channel.
    ///
    /// Runs `passes` times, each pass reading the previous pass's output, so
    /// `Organic > Direct > Direct` becomes `Organic > Organic > Direct` after
    /// one pass and `Organic > Organic > Organic` after two.
    pub fn overwrite_channel_by_time(
        &self,
        selected: &str,
        window_hours: f64,
        passes: usize,
    ) -> Result<Self> {
        if !self.has_timing() {
            return Err(AttributionError::MissingTiming);
        }

        let journeys = self
            .journeys
            .iter()
            .map(|journey| {
                let hours = journey.timing().unwrap_or_default();
                // gaps[i] sits between touch i and touch i + 1; the first touch has none
                let gaps: Vec<f64> = hours.windows(2).map(|w| (w[0] - w[1]).abs()).collect();

                let mut channels = journey.channels.clone();
                for _ in 0..passes {
                    let previous = channels.clone();
                    for (i, gap) in gaps.iter().enumerate() {
                        if previous[i + 1] == selected && *gap < window_hours {
                            channels[i + 1] = previous[i].clone();
                        }
                    }
                }

                Journey {
                    channels,
                    ..journey.clone()
                }
            })
            .collect();

        Ok(Self { journeys })
    }
}

impl<'a> IntoIterator for &'a JourneyCollection {
    type Item = &'a Journey;
    type IntoIter = std::slice::Iter<'a, Journey>;

    fn into_iter(self) -> Self::IntoIter {
        self.journeys.iter()
    }
}

impl TryFrom<Vec<Journey>> for JourneyCollection {
    type Error = AttributionError;

    fn try_from(journeys: Vec<Journey>) -> Result<Self> {
        Self::new(journeys)
    }
}
