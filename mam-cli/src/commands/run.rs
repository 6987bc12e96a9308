//! `mam run`: run the selected models and print the channel table.

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, CellAlignment, Table};
use mam_core::{Attributor, ChannelTable, ModelFamily, ModelSelection};
use serde::Serialize;

use super::{InputArgs, styled_table};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Model family to run (all, heuristic, algorithmic)
    #[arg(long)]
    pub family: Option<ModelFamily>,

    /// Model key to skip, repeatable (e.g. time_decay)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Decimals to print (overrides round_values_to)
    #[arg(long)]
    pub precision: Option<u32>,

    /// Print each model's share of its column total instead of raw credit
    #[arg(long)]
    pub shares: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    table: &'a ChannelTable,
    skipped: &'a [(String, String)],
}

pub fn run(args: RunArgs) -> Result<()> {
    let (journeys, config) = args.input.load()?;
    let selection = apply_overrides(config.models, args.family, args.exclude);
    let precision = args.precision.unwrap_or(config.round_values_to);

    let report = Attributor::new(&journeys).run_all(&selection)?;
    let table = if args.shares {
        report.table.shares().rounded(precision)
    } else {
        report.table.rounded(precision)
    };

    if args.json {
        let output = RunOutput {
            table: &table,
            skipped: &report.skipped,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", render_table(&table));
    for (model, reason) in &report.skipped {
        println!("Skipped {model}: {reason}");
    }
    Ok(())
}

/// Command-line flags layered over the configured selection
fn apply_overrides(
    mut selection: ModelSelection,
    family: Option<ModelFamily>,
    exclude: Vec<String>,
) -> ModelSelection {
    if let Some(family) = family {
        selection.family = family;
    }
    for key in exclude {
        if !selection.exclude.contains(&key) {
            selection.exclude.push(key);
        }
    }
    selection
}

/// One row per channel, one column per model
pub fn render_table(table: &ChannelTable) -> Table {
    let headers = std::iter::once("Channel".to_string()).chain(table.models().iter().cloned());
    let mut rendered = styled_table(headers);

    for channel in table.channels() {
        let mut row = vec![Cell::new(channel)];
        row.extend(
            table
                .row(channel)
                .into_iter()
                .map(|value| Cell::new(value).set_alignment(CellAlignment::Right)),
        );
        rendered.add_row(row);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use mam_core::ChannelTotals;

    #[test]
    fn test_apply_overrides() {
        let selection = ModelSelection {
            exclude: vec!["markov".into()],
            ..ModelSelection::default()
        };
        let selection = apply_overrides(
            selection,
            Some(ModelFamily::Algorithmic),
            vec!["markov".into(), "shapley".into()],
        );
        assert_eq!(selection.family, ModelFamily::Algorithmic);
        assert_eq!(selection.exclude, vec!["markov", "shapley"]);
        assert!(selection.models().is_empty());
    }

    #[test]
    fn test_render_table_lists_channels_and_models() {
        let totals: ChannelTotals = [("Email".to_string(), 1.5), ("Direct".to_string(), 2.0)]
            .into_iter()
            .collect();
        let table = ChannelTable::new().merge("attribution_linear_heuristic", &totals);

        let rendered = render_table(&table).to_string();
        assert!(rendered.contains("Channel"));
        assert!(rendered.contains("attribution_linear_heuristic"));
        assert!(rendered.contains("Email"));
        assert!(rendered.contains("1.5"));
    }
}
