//! Image decoding with content-based format detection and size limits.

use image::{ImageError, ImageFormat, ImageReader, RgbaImage};
use std::io::{BufRead, Cursor, Seek};
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Result of decoding an image.
pub struct DecodedImage {
    /// Pixels converted to 8-bit RGBA
    pub image: RgbaImage,
    /// Detected image format
    pub format: ImageFormat,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Image decoder with configurable limits.
///
/// Every error it returns is per-file: the caller logs it and moves on.
#[derive(Debug, Clone, Default)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

impl ImageDecoder {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode the file at `path`.
    ///
    /// The size limit is checked from metadata, and the format is sniffed
    /// from the file header, so a large non-image file is rejected without
    /// being read into memory.
    pub fn decode_path(&self, path: &Path) -> PipelineResult<DecodedImage> {
        let size = std::fs::metadata(path).map_err(|e| read_error(path, e))?.len();
        let max_bytes = self.limits.max_file_size_mb.saturating_mul(BYTES_PER_MB);
        if size > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: size.div_ceil(BYTES_PER_MB),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        // `open` presets the format from the extension; sniffing overrides it.
        let reader = ImageReader::open(path).map_err(|e| read_error(path, e))?;
        self.decode_reader(reader, path)
    }

    /// Decode an in-memory buffer. `path` is only used for error context and
    /// as an extension fallback when the content can't be sniffed.
    pub fn decode_bytes(&self, bytes: Vec<u8>, path: &Path) -> PipelineResult<DecodedImage> {
        self.decode_reader(ImageReader::new(Cursor::new(bytes)), path)
    }

    fn decode_reader<R: BufRead + Seek>(
        &self,
        reader: ImageReader<R>,
        path: &Path,
    ) -> PipelineResult<DecodedImage> {
        let mut reader = reader
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot detect image format: {}", e),
            })?;
        let format = match reader.format() {
            Some(f) => f,
            None => {
                let f = ImageFormat::from_path(path).map_err(|_| unsupported(path))?;
                reader.set_format(f);
                f
            }
        };

        let mut limits = image::Limits::default();
        limits.max_image_width = Some(self.limits.max_image_dimension);
        limits.max_image_height = Some(self.limits.max_image_dimension);
        reader.limits(limits);

        let image = reader.decode().map_err(|e| match e {
            ImageError::Unsupported(_) => PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: format_to_string(format),
            },
            ImageError::Limits(_) => PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                max_dim: self.limits.max_image_dimension,
            },
            other => PipelineError::Decode {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        })?;

        Ok(DecodedImage {
            image: image.to_rgba8(),
            format,
        })
    }
}

fn read_error(path: &Path, e: std::io::Error) -> PipelineError {
    PipelineError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn unsupported(path: &Path) -> PipelineError {
    PipelineError::UnsupportedFormat {
        path: path.to_path_buf(),
        format: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("unknown")
            .to_string(),
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba};

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn decode(bytes: Vec<u8>, name: &str) -> PipelineResult<DecodedImage> {
        ImageDecoder::default().decode_bytes(bytes, Path::new(name))
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::WebP), "webp");
    }

    #[test]
    fn test_decode_png_roundtrips_pixels() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4]));
        let decoded = decode(png_bytes(&img), "a.png").unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.image, img);
    }

    #[test]
    fn test_format_detected_by_content() {
        // PNG bytes behind a .jpg name are still a PNG
        let img = RgbaImage::new(2, 2);
        let decoded = decode(png_bytes(&img), "misnamed.jpg").unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
    }

    #[test]
    fn test_jpeg_is_detected() {
        let rgb = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([90, 90, 90, 255])));
        let mut buf = Cursor::new(Vec::new());
        rgb.to_rgb8().write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        let decoded = decode(buf.into_inner(), "photo").unwrap();
        assert_eq!(decoded.format, ImageFormat::Jpeg);
        assert_eq!(decoded.image.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_garbage_is_a_per_file_error() {
        let err = decode(b"definitely not an image".to_vec(), "notes.txt").err().unwrap();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("notes.txt"));
    }

    #[test]
    fn test_truncated_png_is_a_decode_error() {
        let bytes = png_bytes(&RgbaImage::new(16, 16));
        let truncated = bytes[..bytes.len() / 2].to_vec();
        let err = decode(truncated, "cut.png").err().unwrap();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageDecoder::default()
            .decode_path(&dir.path().join("gone.png"))
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Read { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_decode_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.png");
        let img = RgbaImage::from_pixel(5, 4, Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();

        let decoded = ImageDecoder::default().decode_path(&path).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!(decoded.image, img);
    }

    #[test]
    fn test_oversized_file_is_skipped_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.bin");
        let file = std::fs::File::create(&path).unwrap();
        // Sparse file: 3 MB logical size, nothing written.
        file.set_len(3 * BYTES_PER_MB).unwrap();

        let decoder = ImageDecoder::new(LimitsConfig {
            max_file_size_mb: 2,
            ..LimitsConfig::default()
        });
        let err = decoder.decode_path(&path).err().unwrap();
        assert!(matches!(
            err,
            PipelineError::FileTooLarge {
                size_mb: 3,
                max_mb: 2,
                ..
            }
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_dimension_limit() {
        let decoder = ImageDecoder::new(LimitsConfig {
            max_image_dimension: 8,
            ..LimitsConfig::default()
        });
        let wide = png_bytes(&RgbaImage::new(9, 2));
        let err = decoder.decode_bytes(wide, Path::new("wide.png")).err().unwrap();
        assert!(matches!(err, PipelineError::ImageTooLarge { max_dim: 8, .. }));

        let ok = png_bytes(&RgbaImage::new(8, 8));
        assert!(decoder.decode_bytes(ok, Path::new("ok.png")).is_ok());
    }
}
