//! `mam shapley`: channel-combination conversion table with Shapley credit.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, CellAlignment, Table};
use mam_core::shapley::{self, CombinationCredit, ShapleyDiagnostics};
use mam_core::{Combination, round_to};

use super::{InputArgs, styled_table};

#[derive(Args, Debug)]
pub struct ShapleyArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn run(args: ShapleyArgs) -> Result<()> {
    let (journeys, config) = args.input.load()?;
    let outcome = shapley::attribute(&journeys, &config.models.shapley)?;

    println!(
        "{}",
        render_conversion_table(
            &outcome.diagnostics,
            &config.path_separator,
            config.round_values_to
        )
    );
    Ok(())
}

fn number(value: f64, precision: u32) -> Cell {
    Cell::new(round_to(value, precision)).set_alignment(CellAlignment::Right)
}

/// One row per combination; the credit column is empty when nothing converted
fn render_conversion_table(
    diagnostics: &ShapleyDiagnostics,
    separator: &str,
    precision: u32,
) -> Table {
    let credits: BTreeMap<&Combination, &CombinationCredit> = diagnostics
        .combination_credits
        .iter()
        .map(|c| (&c.combination, c))
        .collect();

    let mut table = styled_table([
        "Combination",
        "Conversions",
        "Total sequences",
        "Conversion value",
        "Conv rate",
        "Shapley credit",
    ]);
    for row in &diagnostics.conversion_table {
        let credit = credits
            .get(&row.combination)
            .map(|c| {
                c.credits
                    .iter()
                    .map(|v| round_to(*v, precision).to_string())
                    .collect::<Vec<_>>()
                    .join(separator)
            })
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(row.combination.join(separator)),
            Cell::new(row.conversions).set_alignment(CellAlignment::Right),
            Cell::new(row.total_sequences).set_alignment(CellAlignment::Right),
            number(row.conversion_value, precision),
            number(row.conv_rate, precision),
            Cell::new(credit),
        ]);
    }
    table
}
