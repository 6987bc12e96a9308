use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "mam", about = "Multi-touch marketing attribution")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run attribution models and print the channel table
    Run(commands::run::RunArgs),
    /// Print per-journey credit for one model
    Journeys(commands::journeys::JourneysArgs),
    /// Print the Markov transition matrix and removal effects
    Markov(commands::markov::MarkovArgs),
    /// Print the Shapley conversion table
    Shapley(commands::shapley::ShapleyArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose; logs go to stderr so stdout stays clean
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Journeys(args) => commands::journeys::run(args),
        Commands::Markov(args) => commands::markov::run(args),
        Commands::Shapley(args) => commands::shapley::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
