//! CLI enum types for the apply command.

use clap::ValueEnum;

/// How the run summary is reported on stdout.
#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum SummaryFormat {
    /// Plain text lines (default)
    #[default]
    Text,
    /// A single JSON object
    Json,
}

impl std::fmt::Display for SummaryFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryFormat::Text => write!(f, "text"),
            SummaryFormat::Json => write!(f, "json"),
        }
    }
}
