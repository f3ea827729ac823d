//! Tickflow CLI
//!
//! Scaffold, check and run cycle-driven dataflow pipelines.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Tickflow - cycle-driven dataflow pipelines
#[derive(Parser)]
#[command(name = "tickflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file or project directory
    #[arg(short, long, default_value = "tickflow.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with the sensor fusion example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Pipeline name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Run the pipeline until a source is exhausted
    Run {
        /// Stop after this many complete cycles
        #[arg(long)]
        max_cycles: Option<u64>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration and wiring without running
    Validate,

    /// Show nodes and the connector execution order
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout belongs to console sinks and reports
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref())?;
        }
        Commands::Run { max_cycles, json } => {
            commands::run::run(&cli.config, max_cycles, json)?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config)?;
        }
        Commands::Show => {
            commands::show::run(&cli.config)?;
        }
    }

    Ok(())
}
