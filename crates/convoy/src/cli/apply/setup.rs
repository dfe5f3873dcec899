//! Pipeline setup: operation resolution, config overrides, path checks.

use convoy_core::config::{Overflow, TokenGranularity};
use convoy_core::{kernel, BatchPipeline, Config, ImageProcessor};
use std::path::{Path, PathBuf};

use super::{ApplyArgs, ApplyContext};

/// Resolve the operation, fold CLI flags into config, and build the pipeline.
///
/// The operation is resolved first so a bad `--filter` or `--custom` fails
/// before anything on disk is touched.
pub fn setup_pipeline(args: &ApplyArgs, mut config: Config) -> anyhow::Result<ApplyContext> {
    let operation = kernel::resolve(args.operation.as_deref(), args.custom.as_deref())?;

    apply_overrides(&mut config, args);
    config.validate()?;

    let input = expand_path(&args.path);
    if !input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            input
        );
    }

    tracing::debug!(
        "Operation {}, {} worker(s), repeat {}, overflow {:?}",
        operation.label(),
        config.processing.workers,
        config.processing.repeat,
        config.convolution.overflow
    );

    let processor = ImageProcessor::new(operation, &config);
    Ok(ApplyContext {
        pipeline: BatchPipeline::new(processor, &config),
        input,
    })
}

/// CLI flags take precedence over the config file.
fn apply_overrides(config: &mut Config, args: &ApplyArgs) {
    if let Some(repeat) = args.repeat {
        config.processing.repeat = repeat;
    }
    if let Some(workers) = args.workers {
        config.processing.workers = workers;
    }
    if let Some(ref output) = args.output {
        config.output.dir = output.clone();
    }
    if args.saturate {
        config.convolution.overflow = Overflow::Saturate;
    }
    if args.rows {
        config.processing.granularity = TokenGranularity::Row;
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let args = ApplyArgs {
            repeat: Some(3),
            workers: Some(9),
            output: Some(PathBuf::from("elsewhere")),
            saturate: true,
            rows: true,
            ..ApplyArgs::default()
        };
        let mut config = Config::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.processing.repeat, 3);
        assert_eq!(config.processing.workers, 9);
        assert_eq!(config.output.dir, PathBuf::from("elsewhere"));
        assert_eq!(config.convolution.overflow, Overflow::Saturate);
        assert_eq!(config.processing.granularity, TokenGranularity::Row);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = Config::default();
        config.processing.workers = 7;
        apply_overrides(&mut config, &ApplyArgs::default());
        assert_eq!(config.processing.workers, 7);
        assert_eq!(config.convolution.overflow, Overflow::Wrap);
    }

    #[test]
    fn test_missing_operation_is_rejected() {
        let err = setup_pipeline(&ApplyArgs::default(), Config::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("operation"));
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let args = ApplyArgs {
            operation: Some("Blur".to_string()),
            workers: Some(0),
            ..ApplyArgs::default()
        };
        assert!(setup_pipeline(&args, Config::default()).is_err());
    }

    #[test]
    fn test_missing_input_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let args = ApplyArgs {
            path: tmp.path().join("nope"),
            operation: Some("Blur".to_string()),
            ..ApplyArgs::default()
        };
        let err = setup_pipeline(&args, Config::default()).err().unwrap();
        assert!(err.to_string().contains("does not exist"));
    }
}
