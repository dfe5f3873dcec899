//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How often workers report progress to the aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenGranularity {
    /// One completion token per written file
    #[default]
    File,
    /// One token per finished output row, then one per written file
    Row,
}

/// How a convolution sum is narrowed to an 8-bit channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    /// Truncate toward zero, then wrap modulo 256 (`-1` becomes 255)
    #[default]
    Wrap,
    /// Truncate toward zero, then clamp to `0..=255`
    Saturate,
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of long-lived pool workers
    pub workers: usize,

    /// Times each kernel pass is recomputed per pixel (throughput stress knob)
    pub repeat: u32,

    /// Completion token granularity
    pub granularity: TokenGranularity,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            repeat: 1,
            granularity: TokenGranularity::File,
        }
    }
}

/// Pipeline settings for backpressure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max paths buffered between the walker and the worker pool
    pub buffer_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { buffer_size: 100 }
    }
}

/// Directory walk settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Directory listings allowed in flight at once
    pub max_concurrent_listings: usize,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_concurrent_listings: 20,
        }
    }
}

/// Convolution engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvolutionConfig {
    /// Channel narrowing rule
    pub overflow: Overflow,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory transformed images are written to (relative to the
    /// working directory unless absolute)
    pub dir: PathBuf,

    /// JPEG encoder quality for JPEG sources
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outImages"),
            jpeg_quality: 75,
        }
    }
}

/// Per-file input limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Files larger than this are skipped without being read
    pub max_file_size_mb: u64,

    /// Maximum decoded width or height in pixels
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
