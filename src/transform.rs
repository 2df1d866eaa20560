//! Post-download transform applied to each written asset.
//!
//! The default [`ImageRecompressor`] shrinks images to fit a 1920×1080 box
//! and re-encodes them as JPEG in place. A failed transform leaves the
//! original file untouched; the asset writer reports it as a warning.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader, Rgb, RgbImage};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Largest width kept by the recompressor.
pub const MAX_WIDTH: u32 = 1920;
/// Largest height kept by the recompressor.
pub const MAX_HEIGHT: u32 = 1080;
/// JPEG quality used when re-encoding.
pub const JPEG_QUALITY: u8 = 80;

/// Errors from a post-download transform.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The file is not a decodable image.
    #[error("cannot decode image {path}: {source}")]
    Decode {
        /// File being transformed.
        path: PathBuf,
        /// Codec error.
        #[source]
        source: image::ImageError,
    },

    /// Re-encoding failed.
    #[error("cannot encode image {path}: {source}")]
    Encode {
        /// File being transformed.
        path: PathBuf,
        /// Codec error.
        #[source]
        source: image::ImageError,
    },

    /// Temporary file or rename failed.
    #[error("I/O error transforming {path}: {source}")]
    Io {
        /// File being transformed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl TransformError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// An in-place rewrite of a downloaded file.
///
/// Called from the blocking thread pool, so implementations may do
/// synchronous CPU and file work.
pub trait Transform: Send + Sync {
    /// Rewrites the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] when the file cannot be transformed; the
    /// file must then be left as it was.
    fn apply(&self, path: &Path) -> Result<(), TransformError>;
}

/// Shrinks and re-encodes images as JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRecompressor {
    max_width: u32,
    max_height: u32,
    quality: u8,
}

impl Default for ImageRecompressor {
    fn default() -> Self {
        Self {
            max_width: MAX_WIDTH,
            max_height: MAX_HEIGHT,
            quality: JPEG_QUALITY,
        }
    }
}

impl ImageRecompressor {
    /// Recompressor with a custom bounding box and quality (clamped to 1..=100).
    #[must_use]
    pub fn new(max_width: u32, max_height: u32, quality: u8) -> Self {
        Self {
            max_width: max_width.max(1),
            max_height: max_height.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    fn fit(&self, img: DynamicImage) -> DynamicImage {
        let (w, h) = img.dimensions();
        if w > self.max_width || h > self.max_height {
            img.resize(self.max_width, self.max_height, FilterType::Lanczos3)
        } else {
            img
        }
    }
}

impl Transform for ImageRecompressor {
    fn apply(&self, path: &Path) -> Result<(), TransformError> {
        let decode_err = |source| TransformError::Decode {
            path: path.to_path_buf(),
            source,
        };
        let img = ImageReader::open(path)
            .map_err(|e| TransformError::io(path, e))?
            .with_guessed_format()
            .map_err(|e| TransformError::io(path, e))?
            .decode()
            .map_err(decode_err)?;

        let original = img.dimensions();
        let rgb = flatten_onto_white(self.fit(img));

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| TransformError::io(path, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            let encoder = JpegEncoder::new_with_quality(&mut writer, self.quality);
            rgb.write_with_encoder(encoder)
                .map_err(|source| TransformError::Encode {
                    path: path.to_path_buf(),
                    source,
                })?;
            writer.flush().map_err(|e| TransformError::io(path, e))?;
        }
        tmp.persist(path)
            .map_err(|e| TransformError::io(path, e.error))?;

        debug!(
            path = %path.display(),
            from = ?original,
            to = ?rgb.dimensions(),
            "image recompressed"
        );
        Ok(())
    }
}

/// Drops the alpha channel by compositing onto a white background.
fn flatten_onto_white(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        let blend = |c: u8| {
            let mixed = (u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255;
            u8::try_from(mixed).unwrap_or(u8::MAX)
        };
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_png(path: &Path, img: &DynamicImage) {
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    #[test]
    fn test_large_image_is_shrunk_to_fit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.png");
        write_png(&path, &DynamicImage::new_rgb8(4000, 1000));

        ImageRecompressor::default().apply(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!(out.dimensions(), (1920, 480));
    }

    #[test]
    fn test_small_image_keeps_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small.png");
        write_png(&path, &DynamicImage::new_rgb8(64, 32));

        ImageRecompressor::default().apply(&path).unwrap();

        let out = image::open(&path).unwrap();
        assert_eq!(out.dimensions(), (64, 32));
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alpha.png");
        let img = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0]));
        write_png(&path, &DynamicImage::ImageRgba8(img));

        ImageRecompressor::default().apply(&path).unwrap();

        let out = image::open(&path).unwrap().to_rgb8();
        let Rgb([r, g, b]) = *out.get_pixel(8, 8);
        assert!(r > 240 && g > 240 && b > 240, "expected white, got {r},{g},{b}");
    }

    #[test]
    fn test_flatten_keeps_opaque_colour() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255]));
        let out = flatten_onto_white(DynamicImage::ImageRgba8(img));
        assert_eq!(out.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_undecodable_file_is_left_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let error = ImageRecompressor::default().apply(&path).unwrap_err();
        assert!(matches!(error, TransformError::Decode { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"not an image");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_new_clamps_quality() {
        let r = ImageRecompressor::new(0, 10, 0);
        assert_eq!(r, ImageRecompressor::new(1, 10, 1));
    }
}
