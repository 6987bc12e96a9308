//! Channel aggregate table
//!
//! Outer join of every model's channel totals, one column per model. The
//! table is a plain value: `merge` consumes it and returns the updated table,
//! so runs fold into it without shared state.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::credit::{ChannelTotals, round_to};

/// Channel × model credit totals; absent cells read as 0
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelTable {
    /// Model columns in first-run order
    models: Vec<String>,
    /// channel -> model -> total
    rows: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one model's totals into the table
    ///
    /// Re-running a model replaces its column; channels missing from the new
    /// totals drop to 0 for that model.
    pub fn merge(mut self, model: &str, totals: &ChannelTotals) -> Self {
        if self.models.iter().any(|m| m == model) {
            for cells in self.rows.values_mut() {
                cells.remove(model);
            }
        } else {
            self.models.push(model.to_string());
        }

        for (channel, total) in totals {
            self.rows
                .entry(channel.clone())
                .or_default()
                .insert(model.to_string(), *total);
        }
        self
    }

    /// Total for `channel` under `model`, 0 when missing
    pub fn get(&self, channel: &str, model: &str) -> f64 {
        self.rows
            .get(channel)
            .and_then(|cells| cells.get(model))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Union of channels seen by any model, sorted
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn channel_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One model's column over every channel, zero-filled
    pub fn column(&self, model: &str) -> Vec<(&str, f64)> {
        self.channels()
            .map(|channel| (channel, self.get(channel, model)))
            .collect()
    }

    /// One channel's row over every model, zero-filled
    pub fn row(&self, channel: &str) -> Vec<f64> {
        self.models.iter().map(|m| self.get(channel, m)).collect()
    }

    /// Every cell rounded to `precision` decimals, with missing cells filled in
    pub fn rounded(&self, precision: u32) -> Self {
        self.map_columns(|_, value| round_to(value, precision))
    }

    /// Each column divided by its total; a zero total gives zero shares
    pub fn shares(&self) -> Self {
        let totals: BTreeMap<&str, f64> = self
            .models
            .iter()
            .map(|m| (m.as_str(), self.column(m).iter().map(|(_, v)| v).sum()))
            .collect();

        self.map_columns(|model, value| {
            let total = totals[model];
            if total == 0.0 { 0.0 } else { value / total }
        })
    }

    fn map_columns<F>(&self, f: F) -> Self
    where
        F: Fn(&str, f64) -> f64,
    {
        let rows = self
            .rows
            .keys()
            .map(|channel| {
                let cells = self
                    .models
                    .iter()
                    .map(|model| (model.clone(), f(model, self.get(channel, model))))
                    .collect();
                (channel.clone(), cells)
            })
            .collect();

        Self {
            models: self.models.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(pairs: &[(&str, f64)]) -> ChannelTotals {
        pairs.iter().map(|(c, v)| (c.to_string(), *v)).collect()
    }

    #[test]
    fn test_outer_join_fills_zero() {
        let table = ChannelTable::new()
            .merge("first", &totals(&[("A", 3.0), ("B", 1.0)]))
            .merge("last", &totals(&[("B", 2.0), ("C", 2.0)]));

        assert_eq!(table.models(), ["first", "last"]);
        assert_eq!(table.channels().collect::<Vec<_>>(), ["A", "B", "C"]);
        assert_eq!(table.get("A", "last"), 0.0);
        assert_eq!(table.get("C", "first"), 0.0);
        assert_eq!(table.row("B"), vec![1.0, 2.0]);
    }

    #[test]
    fn test_rerun_overwrites_column() {
        let table = ChannelTable::new()
            .merge("linear", &totals(&[("A", 3.0), ("B", 1.0)]))
            .merge("linear", &totals(&[("A", 5.0)]));

        assert_eq!(table.models(), ["linear"]);
        assert_eq!(table.get("A", "linear"), 5.0);
        assert_eq!(table.get("B", "linear"), 0.0);
        // channel set stays the union of everything seen
        assert_eq!(table.channel_count(), 2);
    }

    #[test]
    fn test_shares() {
        let table = ChannelTable::new()
            .merge("m", &totals(&[("A", 3.0), ("B", 1.0)]))
            .merge("empty", &totals(&[("A", 0.0)]));
        let shares = table.shares();
        assert_eq!(shares.get("A", "m"), 0.75);
        assert_eq!(shares.get("B", "m"), 0.25);
        assert_eq!(shares.get("A", "empty"), 0.0);
    }

    #[test]
    fn test_rounded() {
        let table = ChannelTable::new().merge("m", &totals(&[("A", 1.0 / 3.0)]));
        assert_eq!(table.rounded(2).get("A", "m"), 0.33);
    }
}
