//! Output side of the codec adapter: encode a transformed image and write it
//! into the output directory under the source's base name.
//!
//! JPEG sources are written back as JPEG; every other format becomes PNG.
//! The file name is kept verbatim, so `a.gif` is written as PNG data named
//! `a.gif`. Each file is encoded into a temporary file in the output
//! directory and renamed over the target, so two sources with the same base
//! name never interleave their bytes; the last rename wins.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageError, ImageFormat, RgbaImage};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};

/// Encoded output format for a given source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// JPEG stays JPEG, everything else becomes PNG.
    pub fn for_source(format: ImageFormat) -> Self {
        if format == ImageFormat::Jpeg {
            Self::Jpeg
        } else {
            Self::Png
        }
    }
}

/// Writes transformed images into one output directory.
///
/// Shared by every worker. The directory is created lazily on the first
/// write; concurrent creation attempts that find it already present are not
/// errors.
pub struct OutputWriter {
    dir: PathBuf,
    jpeg_quality: u8,
    dir_ready: AtomicBool,
}

impl OutputWriter {
    /// Create a writer targeting `dir`.
    pub fn new(dir: impl Into<PathBuf>, jpeg_quality: u8) -> Self {
        Self {
            dir: dir.into(),
            jpeg_quality,
            dir_ready: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.output_dir(), config.output.jpeg_quality)
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if it does not exist yet.
    pub fn ensure_dir(&self) -> PipelineResult<()> {
        if self.dir_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        match std::fs::create_dir_all(&self.dir) {
            Ok(()) => {}
            // Lost a creation race: fine as long as a directory is there now.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && self.dir.is_dir() => {}
            Err(source) => {
                return Err(PipelineError::OutputDir {
                    path: self.dir.clone(),
                    source,
                })
            }
        }
        self.dir_ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Target path for a given source file.
    pub fn target_for(&self, source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "output".into());
        self.dir.join(name)
    }

    /// Encode `image` and write it next to its siblings in the output
    /// directory. Returns the written path.
    ///
    /// All failures here are fatal for the run.
    pub fn write(
        &self,
        image: &RgbaImage,
        source_format: ImageFormat,
        source: &Path,
    ) -> PipelineResult<PathBuf> {
        self.ensure_dir()?;
        let target = self.target_for(source);

        let output_file = |source| PipelineError::OutputFile {
            path: target.clone(),
            source,
        };

        let mut staged = tempfile::Builder::new()
            .prefix(".convoy-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(output_file)?;
        let mut writer = BufWriter::new(staged.as_file_mut());

        let encoded = match OutputFormat::for_source(source_format) {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
                let encoder = JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality);
                rgb.write_with_encoder(encoder)
            }
            OutputFormat::Png => image.write_with_encoder(PngEncoder::new(&mut writer)),
        };
        encoded.map_err(|e| match e {
            ImageError::IoError(source) => output_file(source),
            other => PipelineError::Encode {
                path: target.clone(),
                message: other.to_string(),
            },
        })?;
        writer.flush().map_err(output_file)?;
        drop(writer);

        // Temp files are created owner-only; outputs are ordinary files.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            staged
                .as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))
                .map_err(output_file)?;
        }

        staged.persist(&target).map_err(|e| output_file(e.error))?;
        Ok(target)
    }
}
