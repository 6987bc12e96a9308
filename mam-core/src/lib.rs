//! mam-core - Multi-touch marketing attribution
//!
//! This crate allocates the value of conversions across the marketing
//! channels touched on each customer journey. It provides rule-based
//! heuristics (first/last click, linear, position and time weighting), a
//! Markov-chain removal-effect model and a Shapley value model, all folded
//! into one channel-by-model aggregate table.

pub mod aggregate;
pub mod config;
pub mod credit;
pub mod error;
pub mod heuristic;
pub mod journey;
pub mod markov;
pub mod model;
pub mod shapley;

pub use aggregate::ChannelTable;
pub use config::{
    AttributionConfig, CustomValue, MarkovConfig, ModelFamily, ModelSelection, PositionWeights,
    ShapleyConfig, ShapleyValues, TimeDecayConfig, ValueMode,
};
pub use credit::{ChannelTotals, CreditVector, channel_totals, round_to};
pub use error::{AttributionError, Result};
pub use journey::{Journey, JourneyCollection};
pub use markov::{MarkovDiagnostics, MarkovOutcome};
pub use model::{
    AttributionModel, AttributionReport, Attributor, Diagnostics, MODEL_KEYS, ModelOutcome,
    ModelRun,
};
pub use shapley::{Combination, ConversionRow, ConversionTable, ShapleyDiagnostics, ShapleyOutcome};
