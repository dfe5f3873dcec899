//! Worker pool that turns discovered paths into completion tokens.
//!
//! A fixed number of long-lived workers share one path receiver. Each job
//! runs on the blocking pool since decode and convolution are CPU-bound.
//! The supervisor joins every worker before dropping its own token sender,
//! so the aggregator sees end-of-stream only after the last worker is done.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};

use crate::config::{Config, TokenGranularity};
use crate::error::{PipelineError, PipelineResult};
use crate::types::CompletionToken;

use super::processor::ImageProcessor;

/// Fans discovered paths out to a fixed pool of workers.
pub struct Dispatcher {
    processor: Arc<ImageProcessor>,
    workers: usize,
    granularity: TokenGranularity,
}

impl Dispatcher {
    pub fn new(processor: Arc<ImageProcessor>, config: &Config) -> Self {
        Self {
            processor,
            workers: config.processing.workers.max(1),
            granularity: config.processing.granularity,
        }
    }

    /// Run the pool on its own task.
    pub fn spawn(
        self,
        jobs: mpsc::Receiver<PathBuf>,
        tokens: mpsc::Sender<CompletionToken>,
    ) -> JoinHandle<PipelineResult<()>> {
        tokio::spawn(self.run(jobs, tokens))
    }

    /// Process every path until `jobs` closes.
    ///
    /// Returns the first fatal error, after aborting the remaining workers.
    pub async fn run(
        self,
        jobs: mpsc::Receiver<PathBuf>,
        tokens: mpsc::Sender<CompletionToken>,
    ) -> PipelineResult<()> {
        let jobs = Arc::new(Mutex::new(jobs));
        let mut pool = JoinSet::new();

        for worker_id in 0..self.workers {
            pool.spawn(worker_loop(
                worker_id,
                Arc::clone(&self.processor),
                self.granularity,
                Arc::clone(&jobs),
                tokens.clone(),
            ));
        }
        tracing::debug!("Started {} workers", self.workers);

        let mut outcome = Ok(());
        while let Some(joined) = pool.join_next().await {
            let result = joined
                .map_err(|e| PipelineError::Worker(e.to_string()))
                .and_then(|r| r);
            if let Err(e) = result {
                if outcome.is_ok() {
                    tracing::error!("Fatal: {}", e);
                    pool.abort_all();
                    outcome = Err(e);
                }
            }
        }

        // Every worker is done: closing our sender ends the token stream.
        drop(tokens);
        outcome
    }
}

async fn worker_loop(
    worker_id: usize,
    processor: Arc<ImageProcessor>,
    granularity: TokenGranularity,
    jobs: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
    tokens: mpsc::Sender<CompletionToken>,
) -> PipelineResult<()> {
    loop {
        let path = {
            let mut rx = jobs.lock().await;
            match rx.recv().await {
                Some(path) => path,
                None => break,
            }
        };

        let job_processor = Arc::clone(&processor);
        let row_tokens = tokens.clone();
        let job_path = path.clone();
        let result = tokio::task::spawn_blocking(move || {
            job_processor.process(&job_path, |_| {
                if granularity == TokenGranularity::Row {
                    // Receiver gone means the run is over; nothing to report to.
                    let _ = row_tokens.blocking_send(CompletionToken::Row);
                }
            })
        })
        .await
        .map_err(|e| PipelineError::Worker(e.to_string()))?;

        let token = match result {
            Ok(_) => CompletionToken::File(path),
            Err(e) if !e.is_fatal() => {
                tracing::error!("Skipped: {}", e);
                CompletionToken::Failed(path)
            }
            Err(e) => return Err(e),
        };

        if tokens.send(token).await.is_err() {
            break;
        }
    }
    tracing::trace!("Worker {} finished", worker_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::lookup;
    use crate::output::OutputWriter;
    use crate::pipeline::aggregate::Aggregator;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::path::Path;

    fn processor(op: &str, out: &Path) -> Arc<ImageProcessor> {
        Arc::new(
            ImageProcessor::new(lookup(op).unwrap(), &Config::default())
                .with_writer(OutputWriter::new(out, 75)),
        )
    }

    fn valid_png(path: &Path, size: u32) {
        RgbaImage::from_pixel(size, size, Rgba([50, 60, 70, 255]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    async fn run_paths(
        dispatcher: Dispatcher,
        paths: Vec<PathBuf>,
    ) -> (PipelineResult<()>, crate::pipeline::aggregate::Totals) {
        let (job_tx, job_rx) = mpsc::channel(4);
        let (token_tx, token_rx) = mpsc::channel(4);
        let handle = dispatcher.spawn(job_rx, token_tx);
        tokio::spawn(async move {
            for p in paths {
                if job_tx.send(p).await.is_err() {
                    break;
                }
            }
        });
        let totals = Aggregator::reduce(token_rx, |_, _| {}).await;
        (handle.await.unwrap(), totals)
    }

    #[tokio::test]
    async fn test_valid_and_corrupt_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..6 {
            let p = tmp.path().join(format!("ok{i}.png"));
            valid_png(&p, 8);
            paths.push(p);
        }
        for i in 0..3 {
            let p = tmp.path().join(format!("bad{i}.png"));
            std::fs::write(&p, b"garbage").unwrap();
            paths.push(p);
        }

        let out = tmp.path().join("out");
        let dispatcher = Dispatcher::new(processor("Blur", &out), &Config::default());
        let (result, totals) = run_paths(dispatcher, paths).await;

        result.unwrap();
        assert_eq!(totals.files, 6);
        assert_eq!(totals.failed, 3);
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 6);
    }

    #[tokio::test]
    async fn test_row_granularity_reports_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        valid_png(&a, 10);
        valid_png(&b, 5);

        let mut config = Config::default();
        config.processing.granularity = TokenGranularity::Row;
        let dispatcher = Dispatcher::new(processor("Identity", &tmp.path().join("out")), &config);
        let (result, totals) = run_paths(dispatcher, vec![a, b]).await;

        result.unwrap();
        assert_eq!(totals.files, 2);
        assert_eq!(totals.rows, 8 + 3);
    }

    #[tokio::test]
    async fn test_fatal_output_error_stops_run() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let src = tmp.path().join("in.png");
        valid_png(&src, 8);

        let sharp = processor("Sharp", &blocker.join("out"));
        let dispatcher = Dispatcher::new(sharp, &Config::default());
        let (result, totals) = run_paths(dispatcher, vec![src]).await;

        assert!(matches!(result, Err(PipelineError::OutputDir { .. })));
        assert_eq!(totals.files, 0);
    }

    #[tokio::test]
    async fn test_no_jobs_closes_token_stream() {
        let tmp = tempfile::tempdir().unwrap();
        let dispatcher = Dispatcher::new(processor("Blur", tmp.path()), &Config::default());
        let (result, totals) = run_paths(dispatcher, Vec::new()).await;
        result.unwrap();
        assert_eq!(totals.files, 0);
    }
}
