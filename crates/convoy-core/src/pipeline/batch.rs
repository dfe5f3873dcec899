//! Whole-run orchestration: walker → worker pool → aggregator.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{CompletionToken, RunSummary};

use super::aggregate::{Aggregator, Totals};
use super::channel::bounded_channel;
use super::discovery::DirectoryWalker;
use super::dispatch::Dispatcher;
use super::processor::ImageProcessor;

/// Wires the pipeline stages together for one input root.
pub struct BatchPipeline {
    processor: Arc<ImageProcessor>,
    config: Config,
}

impl BatchPipeline {
    pub fn new(processor: ImageProcessor, config: &Config) -> Self {
        Self {
            processor: Arc::new(processor),
            config: config.clone(),
        }
    }

    pub fn processor(&self) -> &ImageProcessor {
        &self.processor
    }

    /// Process every file under `root` (or `root` itself if it is a file).
    ///
    /// The walker, the worker pool and the aggregator run concurrently and
    /// only talk through the two bounded channels. `on_token` is called from
    /// the aggregator for every completion token.
    ///
    /// An unreadable root or any output-side failure aborts the run.
    pub async fn run<F>(&self, root: &Path, on_token: F) -> PipelineResult<RunSummary>
    where
        F: FnMut(&CompletionToken, &Totals),
    {
        let start = Instant::now();
        tokio::fs::metadata(root)
            .await
            .map_err(|source| PipelineError::RootUnreadable {
                path: root.to_path_buf(),
                source,
            })?;

        tracing::info!(
            "Applying {} to {:?} -> {:?}",
            self.processor.operation().label(),
            root,
            self.processor.output_dir()
        );

        let (path_tx, path_rx) = bounded_channel(&self.config.pipeline);
        let (token_tx, token_rx) = bounded_channel(&self.config.pipeline);

        let mut walker = DirectoryWalker::new(&self.config.walk);
        if let Some(out) = canonical_target(self.processor.output_dir()) {
            walker = walker.with_excluded(out);
        }
        let walker = walker.spawn(root.to_path_buf(), path_tx);
        let dispatcher =
            Dispatcher::new(Arc::clone(&self.processor), &self.config).spawn(path_rx, token_tx);

        let totals = Aggregator::reduce(token_rx, on_token).await;

        let dispatched = dispatcher
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))?;
        let walk = walker
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))?;
        dispatched?;

        let elapsed = start.elapsed();
        tracing::info!(
            "Processed {} file(s), {} failed, in {:?}",
            totals.files,
            totals.failed,
            elapsed
        );

        Ok(RunSummary {
            totals,
            walk,
            output_dir: self.processor.output_dir().to_path_buf(),
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }
}

/// Canonical form of `dir`, resolved through its nearest existing ancestor
/// when it has not been created yet.
fn canonical_target(dir: &Path) -> Option<PathBuf> {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(dir)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match std::fs::canonicalize(existing) {
            Ok(base) => return Some(missing.iter().rev().fold(base, |acc, part| acc.join(part))),
            Err(_) => {
                missing.push(existing.file_name()?);
                existing = existing.parent()?;
            }
        }
    }
}
