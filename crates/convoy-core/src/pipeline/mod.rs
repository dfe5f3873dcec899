//! Image processing pipeline components.
//!
//! This module contains all the stages of the pipeline:
//! - **discovery**: Walk a directory tree with bounded listing concurrency
//! - **dispatch**: Fixed worker pool consuming discovered paths
//! - **decode**: Load and decode images from various formats
//! - **convolve**: Convolution engine and pointwise grayscale
//! - **processor**: Per-file decode → transform → write
//! - **aggregate**: Fan-in of completion tokens
//! - **batch**: Orchestrates the full run
//! - **channel**: Bounded channels for backpressure

pub mod aggregate;
pub mod batch;
pub mod channel;
pub mod convolve;
pub mod decode;
pub mod discovery;
pub mod dispatch;
pub mod processor;

// Re-exports for convenient access
pub use aggregate::{Aggregator, Totals};
pub use batch::BatchPipeline;
pub use convolve::{apply, convolve_image, grayscale_image, grayscale_pixel, ConvolveOptions};
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DirectoryWalker, WalkStats};
pub use dispatch::Dispatcher;
pub use processor::ImageProcessor;
