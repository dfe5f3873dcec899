//! Convoy CLI - apply a convolution kernel to every image under a path.
//!
//! Convoy walks a file or directory, runs one kernel (or the grayscale
//! transform) over each image on a pool of workers, and writes transformed
//! copies into an output directory.
//!
//! # Usage
//!
//! ```bash
//! # Edge-detect every image under ./photos
//! convoy apply ./photos -f LSobel
//!
//! # Custom 3x3 kernel, saturating instead of wrapping
//! convoy apply ./photos -c "0 -1 0 -1 5 -1 0 -1 0" --saturate
//!
//! # List available kernels
//! convoy kernels
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Convoy - bulk convolution for image trees.
#[derive(Parser, Debug)]
#[command(name = "convoy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply a kernel to every image under a path
    Apply(cli::apply::ApplyArgs),

    /// List the built-in kernels and transforms
    Kernels(cli::kernels::KernelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match convoy_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `convoy config path`."
            );
            convoy_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Convoy v{}", convoy_core::VERSION);

    match cli.command {
        Commands::Apply(args) => cli::apply::execute(args, config).await,
        Commands::Kernels(args) => cli::kernels::execute(args),
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
