//! Boundary masks loaded from disk.

use std::path::{Path, PathBuf};

use flatscan_pipeline::grayscale::decode_mask;
use flatscan_pipeline::{BoundaryPredictor, GrayImage, PipelineError, PrecomputedMask, RgbImage};

/// Errors from loading a mask file.
#[derive(Debug, thiserror::Error)]
pub enum MaskLoadError {
    /// The file could not be read.
    #[error("failed to read mask {path}: {source}")]
    Io {
        /// Mask path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not a decodable image.
    #[error("failed to decode mask {path}: {source}")]
    Decode {
        /// Mask path.
        path: PathBuf,
        /// Underlying error.
        source: PipelineError,
    },
}

/// Predictor backed by a mask image produced ahead of time, for example
/// by an external segmentation model.
///
/// The file is read once, in [`MaskFilePredictor::open`].
#[derive(Debug, Clone)]
pub struct MaskFilePredictor {
    path: PathBuf,
    mask: PrecomputedMask,
}

impl MaskFilePredictor {
    /// Load and decode the mask at `path`. Color masks are converted to
    /// grayscale.
    ///
    /// # Errors
    ///
    /// Returns [`MaskLoadError`] if the file cannot be read or decoded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MaskLoadError> {
        let path = path.as_ref().to_path_buf();
        let bytes = std::fs::read(&path).map_err(|source| MaskLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let mask = decode_mask(&bytes).map_err(|source| MaskLoadError::Decode {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), width = mask.width(), height = mask.height(), "loaded mask");
        Ok(Self {
            path,
            mask: PrecomputedMask::new(mask),
        })
    }

    /// File the mask was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decoded mask at its stored resolution.
    #[must_use]
    pub const fn mask(&self) -> &GrayImage {
        self.mask.mask()
    }
}

impl BoundaryPredictor for MaskFilePredictor {
    fn predict(&self, photo: &RgbImage) -> Result<GrayImage, PipelineError> {
        self.mask.predict(photo)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn loads_png_mask() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mask.png");
        GrayImage::from_fn(6, 4, |x, _| Luma([if x < 3 { 255 } else { 0 }]))
            .save(&path)
            .unwrap();

        let predictor = MaskFilePredictor::open(&path).unwrap();
        assert_eq!(predictor.path(), path);
        let mask = predictor.predict(&RgbImage::new(6, 4)).unwrap();
        assert_eq!(mask.dimensions(), (6, 4));
        assert_eq!(mask.get_pixel(0, 0).0, [255]);
        assert_eq!(mask.get_pixel(5, 3).0, [0]);
    }

    #[test]
    fn color_mask_is_converted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mask.png");
        RgbImage::from_pixel(2, 2, Rgb([255, 255, 255])).save(&path).unwrap();
        let predictor = MaskFilePredictor::open(&path).unwrap();
        assert_eq!(predictor.mask().get_pixel(1, 1).0, [255]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = MaskFilePredictor::open(tmp.path().join("absent.png")).unwrap_err();
        assert!(matches!(err, MaskLoadError::Io { .. }));
    }

    #[test]
    fn garbage_is_decode_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mask.png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        let err = MaskFilePredictor::open(&path).unwrap_err();
        assert!(matches!(
            err,
            MaskLoadError::Decode {
                source: PipelineError::ImageDecode(_),
                ..
            }
        ));
    }
}
