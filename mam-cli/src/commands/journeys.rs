//! `mam journeys`: per-journey credit for one model.

use anyhow::{Result, bail};
use clap::Args;
use comfy_table::{Cell, Table};
use mam_core::{
    AttributionModel, JourneyCollection, MODEL_KEYS, ModelFamily, ModelOutcome, ModelRun,
    ModelSelection,
};

use super::{InputArgs, styled_table};

#[derive(Args, Debug)]
pub struct JourneysArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Model key (e.g. linear, markov, shapley)
    #[arg(short, long)]
    pub model: String,
}

pub fn run(args: JourneysArgs) -> Result<()> {
    let (journeys, config) = args.input.load()?;
    let model = find_model(&config.models, &args.model)?;

    let outcome = match model.run(&journeys)? {
        ModelRun::Completed(outcome) => outcome,
        ModelRun::Skipped { model_name, reason } => bail!("{model_name} did not run: {reason}"),
    };

    println!("{}", outcome.model_name);
    println!(
        "{}",
        render_credits(
            &journeys,
            &outcome,
            &config.path_separator,
            config.round_values_to
        )
    );
    Ok(())
}

/// Configured model for `key`, regardless of family filters and exclusions
fn find_model(selection: &ModelSelection, key: &str) -> Result<AttributionModel> {
    let everything = ModelSelection {
        family: ModelFamily::All,
        exclude: Vec::new(),
        ..selection.clone()
    };
    match everything.models().into_iter().find(|m| m.key() == key) {
        Some(model) => Ok(model),
        None => bail!(
            "Unknown model {key:?}, expected one of: {}",
            MODEL_KEYS.join(", ")
        ),
    }
}

/// One row per journey with its path, timing, outcome and joined credit
fn render_credits(
    journeys: &JourneyCollection,
    outcome: &ModelOutcome,
    separator: &str,
    precision: u32,
) -> Table {
    let mut table = styled_table(["Journey", "Hours", "Converted", "Value", "Credit"]);
    for (journey, credit) in journeys.iter().zip(&outcome.credits) {
        table.add_row(vec![
            Cell::new(journey.path(separator)),
            Cell::new(journey.timing_path(separator).unwrap_or_default()),
            Cell::new(journey.converted()),
            Cell::new(journey.conversion_value()),
            Cell::new(credit.to_delimited(separator, precision)),
        ]);
    }
    table
}
