//! The `convoy apply` command: run one kernel over an image tree.

mod setup;
mod summary;
pub mod types;

pub use types::SummaryFormat;

use clap::Args;
use convoy_core::{BatchPipeline, CompletionToken, Config};
use std::path::PathBuf;

use setup::setup_pipeline;
use summary::{create_spinner, print_summary};

/// Arguments for the `apply` command.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Image file or directory to process
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Named operation (see `convoy kernels`)
    #[arg(short = 'f', long = "filter")]
    pub operation: Option<String>,

    /// Custom 3x3 kernel as nine numbers, row by row (overrides --filter)
    #[arg(short, long, allow_hyphen_values = true)]
    pub custom: Option<String>,

    /// Recompute each output pixel this many times
    #[arg(short, long)]
    pub repeat: Option<u32>,

    /// Output directory (defaults to `outImages`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Clamp channel values to 0..=255 instead of wrapping
    #[arg(long)]
    pub saturate: bool,

    /// Emit one progress token per output row instead of per file
    #[arg(long)]
    pub rows: bool,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,

    /// Summary format on stdout
    #[arg(long, value_enum, default_value = "text")]
    pub summary: SummaryFormat,
}

/// Manual Default impl for constructing ApplyArgs outside of clap.
///
/// Values match the clap `#[arg(default_value = ...)]` annotations above.
impl Default for ApplyArgs {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            operation: None,
            custom: None,
            repeat: None,
            output: None,
            workers: None,
            saturate: false,
            rows: false,
            no_progress: false,
            summary: SummaryFormat::Text,
        }
    }
}

/// Everything assembled by setup_pipeline().
pub(crate) struct ApplyContext {
    pub pipeline: BatchPipeline,
    pub input: PathBuf,
}

/// Execute the apply command.
pub async fn execute(args: ApplyArgs, config: Config) -> anyhow::Result<()> {
    let ctx = setup_pipeline(&args, config)?;

    let spinner = (!args.no_progress).then(create_spinner);
    let summary = ctx
        .pipeline
        .run(&ctx.input, |token, totals| {
            if let Some(pb) = &spinner {
                // Row tokens only advance the spinner.
                if !matches!(token, CompletionToken::Row) {
                    pb.set_message(format!("{} file(s), {} failed", totals.files, totals.failed));
                }
                pb.tick();
            }
        })
        .await;

    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }
    let summary = summary?;

    match args.summary {
        SummaryFormat::Text => {
            println!("Total files: {}", summary.processed());
            println!("Done!");
            println!(
                "Total Elapsed time: {:.3}s.",
                summary.elapsed_ms as f64 / 1000.0
            );
        }
        SummaryFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    print_summary(&summary);
    Ok(())
}
