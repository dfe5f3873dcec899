//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.workers must be > 0".into(),
            ));
        }
        if self.processing.repeat == 0 {
            return Err(ConfigError::ValidationError(
                "processing.repeat must be >= 1".into(),
            ));
        }
        if self.pipeline.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.buffer_size must be > 0".into(),
            ));
        }
        if self.walk.max_concurrent_listings == 0 {
            return Err(ConfigError::ValidationError(
                "walk.max_concurrent_listings must be > 0".into(),
            ));
        }
        if self.output.jpeg_quality == 0 || self.output.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "output.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.output.dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "output.dir must not be empty".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        Ok(())
    }
}
