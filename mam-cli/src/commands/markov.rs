//! `mam markov`: transition matrix and removal effects.

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, CellAlignment, Table};
use mam_core::markov::{self, MarkovDiagnostics};
use mam_core::round_to;

use super::{InputArgs, styled_table};

#[derive(Args, Debug)]
pub struct MarkovArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn run(args: MarkovArgs) -> Result<()> {
    let (journeys, config) = args.input.load()?;
    let outcome = markov::attribute(&journeys, &config.models.markov)?;
    let diagnostics = &outcome.diagnostics;
    let precision = config.round_values_to;

    println!("Transition matrix");
    println!("{}", render_matrix(diagnostics, precision));
    println!();
    println!("Removal effects");
    println!("{}", render_effects(diagnostics, precision));
    println!(
        "Conversion probability: {}",
        round_to(diagnostics.conversion_probability, precision)
    );
    if diagnostics.used_pseudo_inverse {
        println!("Note: singular eigenvector basis, pseudo-inverse was used");
    }
    Ok(())
}

fn number(value: f64, precision: u32) -> Cell {
    Cell::new(round_to(value, precision)).set_alignment(CellAlignment::Right)
}

/// Row-normalized matrix with state labels on both axes
fn render_matrix(diagnostics: &MarkovDiagnostics, precision: u32) -> Table {
    let headers = std::iter::once(String::new()).chain(diagnostics.states.iter().cloned());
    let mut table = styled_table(headers);

    for (state, row) in diagnostics.states.iter().zip(&diagnostics.transition_matrix) {
        let mut cells = vec![Cell::new(state)];
        cells.extend(row.iter().map(|p| number(*p, precision)));
        table.add_row(cells);
    }
    table
}

fn render_effects(diagnostics: &MarkovDiagnostics, precision: u32) -> Table {
    let mut table = styled_table(["Channel", "Removal effect", "Weight"]);
    for (channel, effect) in &diagnostics.removal_effects {
        let weight = diagnostics
            .channel_weights
            .get(channel)
            .copied()
            .unwrap_or(0.0);
        table.add_row(vec![
            Cell::new(channel),
            number(*effect, precision),
            number(weight, precision),
        ]);
    }
    table
}
