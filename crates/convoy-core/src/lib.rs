//! Convoy Core - bulk convolution of image trees.
//!
//! Convoy walks a directory, applies one convolution kernel (or the pointwise
//! grayscale transform) to every image it finds, and writes the transformed
//! copies into an output directory.
//!
//! # Architecture
//!
//! ```text
//! Walker ─paths─▶ Worker pool ─tokens─▶ Aggregator ─▶ RunSummary
//!                 (decode → convolve → encode/write)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use convoy_core::{kernel, BatchPipeline, Config, ImageProcessor};
//!
//! #[tokio::main]
//! async fn main() -> convoy_core::Result<()> {
//!     let config = Config::load()?;
//!     let operation = kernel::resolve(Some("Blur"), None)?;
//!     let pipeline = BatchPipeline::new(ImageProcessor::new(operation, &config), &config);
//!
//!     let summary = pipeline.run("./photos".as_ref(), |_, _| {}).await?;
//!     println!("Total files: {}", summary.processed());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod kernel;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, ConvoyError, KernelError, PipelineError, PipelineResult, Result};
pub use kernel::{Kernel, Operation};
pub use output::OutputWriter;
pub use pipeline::{BatchPipeline, ImageProcessor, Totals, WalkStats};
pub use types::{CompletionToken, ProcessedFile, RunSummary};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
