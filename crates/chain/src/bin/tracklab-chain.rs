//! tracklab full-chain CLI
//!
//! Runs generation, simulation, digitization, seeding and track finding
//! over a number of events as described by a TOML run configuration.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracklab_chain::{build_sequencer, RunConfig};

#[derive(Parser)]
#[command(name = "tracklab-chain")]
#[command(about = "Simulate and reconstruct particle tracks in a silicon tracker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process events
    Run(RunArgs),

    /// Build the pipeline without processing events
    Check {
        /// Run configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    PrintConfig {
        /// Run configuration (TOML); defaults are printed when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Run configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of events, overriding the configuration
    #[arg(short = 'n', long)]
    events: Option<u64>,

    /// Worker threads (0 = all cores), overriding the configuration
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Global random seed, overriding the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for per-event JSON output, overriding the configuration
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<RunConfig> {
    match path {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("loading run configuration {}", path.display())),
        None => Ok(RunConfig::default()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            init_tracing();
            let mut config = load_config(args.config.as_ref())?;
            if let Some(events) = args.events {
                config = config.with_events(events);
            }
            if let Some(workers) = args.workers {
                config = config.with_workers(workers);
            }
            if let Some(seed) = args.seed {
                config = config.with_seed(seed);
            }
            if let Some(output) = args.output {
                config = config.with_output_directory(output);
            }

            let sequencer = build_sequencer(&config).context("building the pipeline")?;
            let summary = sequencer.run(config.events, config.workers)?;
            if !summary.failed.is_empty() {
                bail!(
                    "{} of {} events failed",
                    summary.failed.len(),
                    summary.requested
                );
            }
        }

        Commands::Check { config } => {
            init_tracing();
            let config = load_config(config.as_ref())?;
            let sequencer = build_sequencer(&config).context("building the pipeline")?;
            println!("Pipeline OK: {}", sequencer.stage_names().join(" -> "));
        }

        Commands::PrintConfig { config } => {
            // Logging stays off so stdout is valid TOML.
            let config = load_config(config.as_ref())?;
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}
