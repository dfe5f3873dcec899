//! Core data types passed between pipeline stages.

use serde::Serialize;
use std::path::PathBuf;

use crate::pipeline::aggregate::Totals;
use crate::pipeline::discovery::WalkStats;

/// Progress unit sent from a worker to the aggregator.
///
/// A file may produce any number of `Row` tokens before its final `File` or
/// `Failed` token, so token count is not file count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionToken {
    /// One output row finished (row granularity only)
    Row,
    /// A file was transformed and written
    File(PathBuf),
    /// A file was skipped after a recoverable error
    Failed(PathBuf),
}

impl CompletionToken {
    /// Contribution of this token to the processed-file total.
    pub fn value(&self) -> u64 {
        match self {
            Self::File(_) => 1,
            Self::Row | Self::Failed(_) => 0,
        }
    }
}

/// Result of transforming one file.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedFile {
    /// Source path as discovered
    pub source: PathBuf,

    /// Path the transformed copy was written to
    pub output: PathBuf,

    /// Source format ("jpeg", "png", ...)
    pub format: String,

    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Aggregated completion tokens
    pub totals: Totals,

    /// Directory walk counters
    pub walk: WalkStats,

    /// Output directory
    pub output_dir: PathBuf,

    /// Wall time from start of walk to last token
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Number of files successfully processed.
    pub fn processed(&self) -> u64 {
        self.totals.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_file_tokens_count() {
        assert_eq!(CompletionToken::File(PathBuf::from("a.png")).value(), 1);
        assert_eq!(CompletionToken::Row.value(), 0);
        assert_eq!(CompletionToken::Failed(PathBuf::from("b.png")).value(), 0);
    }
}
