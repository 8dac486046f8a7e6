//! verse CLI
//!
//! Picks one experiment mode, loads verse.toml from the working directory
//! and writes every chart, animation and artifact into the configured
//! output directory. Without a mode flag the particle simulations run.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use log::info;
use owo_colors::OwoColorize;
use std::path::Path;

use verse::Config;
use verse::experiments::{RunSummary, connection, contra, multiverse, particles, quantum};

/// Self-referential autoencoder experiments
///
/// Examples:
///   verse                # Particle simulations (gif + cost charts)
///   verse --verse        # Single complex verse
///   verse --multi        # Growth chain, prints "width state" per link
///   verse --contra -v    # Contradiction run with per-step logging
#[derive(Parser, Debug)]
#[command(name = "verse")]
#[command(version)]
#[command(about, long_about = None)]
#[command(group(ArgGroup::new("mode").multiple(false)))]
pub struct Cli {
    /// Train a single complex verse
    #[arg(long, group = "mode")]
    pub verse: bool,

    /// Train two contradicting matrices while tracking their determinants
    #[arg(long, group = "mode")]
    pub contra: bool,

    /// Grow a verse one dimension at a time
    #[arg(long, group = "mode")]
    pub multi: bool,

    /// Fill a matrix with connections and track its determinant
    #[arg(long, group = "mode")]
    pub connect: bool,

    /// Verbose output (per-iteration logging)
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = Config::load(Path::new(".")).context("Failed to load verse.toml")?;
    if cli.verbose {
        eprintln!("{}", config.display_summary());
    }
    std::fs::create_dir_all(&config.output).with_context(|| {
        format!("Failed to create output directory '{}'", config.output.display())
    })?;

    let summaries = run(&cli, &config)?;
    for summary in &summaries {
        report(summary);
    }
    Ok(())
}

fn run(cli: &Cli, config: &Config) -> Result<Vec<RunSummary>> {
    let output = config.output.as_path();
    let summary = if cli.verse {
        quantum::run(&config.verse, output).context("verse run failed")?
    } else if cli.contra {
        contra::run(&config.contra, output).context("contra run failed")?
    } else if cli.multi {
        multiverse::run(&config.multi, output).context("multiverse run failed")?
    } else if cli.connect {
        connection::run(&config.connect, output).context("connection run failed")?
    } else {
        return particles::run_all(&config.particles, output).context("particle simulation failed");
    };
    Ok(vec![summary])
}

fn report(summary: &RunSummary) {
    let status = if summary.diverged {
        "diverged".red().to_string()
    } else {
        "done".green().to_string()
    };
    info!(
        "{} {}: {} steps, final {:.6}",
        summary.name.bold(),
        status,
        summary.iterations,
        summary.final_cost
    );
}
