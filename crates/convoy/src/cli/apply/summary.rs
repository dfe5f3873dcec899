//! Progress spinner and end-of-run summary table.

use convoy_core::RunSummary;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create the spinner shown while the run is in flight.
pub fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    // The template is a literal; fall back to the default style if it ever fails to parse.
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message("starting...");
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Print a formatted summary table to stderr.
pub fn print_summary(summary: &RunSummary) {
    let secs = summary.elapsed_ms as f64 / 1000.0;
    let rate = if secs > 0.0 {
        summary.totals.files as f64 / secs
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", summary.totals.files);
    if summary.totals.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.totals.failed);
    }
    if summary.totals.rows > 0 {
        eprintln!("    Rows:         {:>8}", summary.totals.rows);
    }
    eprintln!("    Directories:  {:>8}", summary.walk.directories);
    if summary.walk.errors > 0 {
        eprintln!("    Walk errors:  {:>8}", summary.walk.errors);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Duration:     {:>7.1}s", secs);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("    Output:       {}", summary.output_dir.display());
    eprintln!("  ====================================");
}
