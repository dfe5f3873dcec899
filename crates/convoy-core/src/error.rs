//! Error types for the convoy pipeline.
//!
//! Errors are organized by stage. Pipeline errors are further split into
//! fatal ones (abort the whole run) and per-file ones (the file is skipped
//! and the run continues); see [`PipelineError::is_fatal`].

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for convoy operations.
#[derive(Error, Debug)]
pub enum ConvoyError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Operation / kernel selection errors
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while selecting or building a kernel.
///
/// All of these are input-validation errors: they are raised before any
/// file is opened.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// A custom kernel spec did not contain exactly nine real numbers
    #[error("Invalid kernel spec {spec:?}: {reason}")]
    InvalidKernelSpec { spec: String, reason: String },

    /// The operation name is not in the kernel table
    #[error("Unknown operation: {0:?} (run `convoy kernels` for the list)")]
    UnknownOperation(String),

    /// Neither an operation name nor a custom kernel was given
    #[error("No operation selected: pass an operation name or a custom kernel")]
    MissingOperation,

    /// Rows of a kernel matrix have different lengths than the row count
    #[error("Kernel must be square, got {rows} rows with a row of length {cols}")]
    NotSquare { rows: usize, cols: usize },

    /// Kernel side length is even (or zero), so there is no center pixel
    #[error("Kernel side length must be odd, got {0}")]
    EvenSide(usize),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input root could not be stat'ed
    #[error("Cannot read input path {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the source file failed
    #[error("Read error for {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File exceeds the size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed the limit
    #[error("Image too large: {path} (width or height > {max_dim})")]
    ImageTooLarge { path: PathBuf, max_dim: u32 },

    /// Image is not larger than the kernel footprint
    #[error("Image too small for a {side}x{side} kernel: {path} ({width}x{height})")]
    ImageTooSmall {
        path: PathBuf,
        width: u32,
        height: u32,
        side: usize,
    },

    /// Output directory could not be created
    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output file could not be created or written
    #[error("Cannot write output file {path}: {source}")]
    OutputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding the transformed image failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// A worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl PipelineError {
    /// Whether this error aborts the entire run.
    ///
    /// Per-file errors (read, decode, unsupported format, size limits) are
    /// reported and skipped; everything touching the output side or the
    /// input root is fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Read { .. }
            | Self::Decode { .. }
            | Self::UnsupportedFormat { .. }
            | Self::FileTooLarge { .. }
            | Self::ImageTooLarge { .. }
            | Self::ImageTooSmall { .. } => false,
            Self::RootUnreadable { .. }
            | Self::OutputDir { .. }
            | Self::OutputFile { .. }
            | Self::Encode { .. }
            | Self::Worker(_) => true,
        }
    }
}

/// Convenience type alias for convoy results.
pub type Result<T> = std::result::Result<T, ConvoyError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
