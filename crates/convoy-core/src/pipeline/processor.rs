//! Per-file processing: decode, transform, encode, write.

use std::path::Path;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::kernel::Operation;
use crate::output::OutputWriter;
use crate::types::ProcessedFile;

use super::convolve::{convolve_image, grayscale_image, ConvolveOptions};
use super::decode::{format_to_string, ImageDecoder};

/// Applies the run's operation to one file at a time.
///
/// Holds only read-only state, so one instance is shared by every worker.
pub struct ImageProcessor {
    operation: Operation,
    options: ConvolveOptions,
    decoder: ImageDecoder,
    writer: OutputWriter,
}

impl ImageProcessor {
    /// Create a processor for `operation` with settings from `config`.
    pub fn new(operation: Operation, config: &Config) -> Self {
        Self {
            operation,
            options: ConvolveOptions::from_config(config),
            decoder: ImageDecoder::new(config.limits.clone()),
            writer: OutputWriter::from_config(config),
        }
    }

    /// Replace the output writer (used to target a specific directory).
    pub fn with_writer(mut self, writer: OutputWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn output_dir(&self) -> &Path {
        self.writer.dir()
    }

    /// Transform one file. Blocking; run it off the async executor.
    ///
    /// `on_row` is called after each finished output row of a convolution.
    pub fn process<F>(&self, path: &Path, on_row: F) -> PipelineResult<ProcessedFile>
    where
        F: FnMut(u32),
    {
        let start = std::time::Instant::now();
        tracing::debug!("Processing: {:?}", path);

        let decoded = self.decoder.decode_path(path)?;
        let decode_time = start.elapsed();
        tracing::trace!("  Decode: {:?}", decode_time);

        let transform_start = std::time::Instant::now();
        let output = match &self.operation {
            Operation::Grayscale => grayscale_image(&decoded.image, &self.options),
            Operation::Convolve(kernel) => {
                convolve_image(&decoded.image, kernel, &self.options, on_row).ok_or_else(|| {
                    PipelineError::ImageTooSmall {
                        path: path.to_path_buf(),
                        width: decoded.width(),
                        height: decoded.height(),
                        side: kernel.side(),
                    }
                })?
            }
        };
        tracing::trace!("  Transform: {:?}", transform_start.elapsed());

        let written = self.writer.write(&output, decoded.format, path)?;

        tracing::debug!(
            "Processed {:?} -> {:?} in {:?} ({}x{})",
            path,
            written,
            start.elapsed(),
            output.width(),
            output.height()
        );

        Ok(ProcessedFile {
            source: path.to_path_buf(),
            output: written,
            format: format_to_string(decoded.format),
            width: output.width(),
            height: output.height(),
        })
    }
}
