//! Boundary prediction: where the glass panels are in a photo.
//!
//! A [`BoundaryPredictor`] turns a photo into a single-channel mask in
//! which values `>= 200` mark panel interiors. Predictors are built once by
//! the caller (loading a network, opening a mask directory, ...) and passed
//! by reference into [`crate::inspect_with_predictor`].

use image::imageops::FilterType;
use image::{GrayImage, RgbImage};

use crate::types::PipelineError;

/// Produces a boundary mask for a photo.
pub trait BoundaryPredictor {
    /// Predict the panel mask for `photo`.
    ///
    /// The mask may have any non-zero size; it is resized to the photo
    /// before segmentation.
    ///
    /// # Errors
    ///
    /// Implementations report their own failures as
    /// [`PipelineError::Predictor`].
    fn predict(&self, photo: &RgbImage) -> Result<GrayImage, PipelineError>;
}

impl<P: BoundaryPredictor + ?Sized> BoundaryPredictor for &P {
    fn predict(&self, photo: &RgbImage) -> Result<GrayImage, PipelineError> {
        (**self).predict(photo)
    }
}

impl<P: BoundaryPredictor + ?Sized> BoundaryPredictor for Box<P> {
    fn predict(&self, photo: &RgbImage) -> Result<GrayImage, PipelineError> {
        (**self).predict(photo)
    }
}

/// A mask computed ahead of time, returned for every photo.
#[derive(Debug, Clone)]
pub struct PrecomputedMask {
    mask: GrayImage,
}

impl PrecomputedMask {
    /// Wrap an existing mask.
    #[must_use]
    pub const fn new(mask: GrayImage) -> Self {
        Self { mask }
    }

    /// Borrow the wrapped mask.
    #[must_use]
    pub const fn mask(&self) -> &GrayImage {
        &self.mask
    }
}

impl BoundaryPredictor for PrecomputedMask {
    fn predict(&self, _photo: &RgbImage) -> Result<GrayImage, PipelineError> {
        Ok(self.mask.clone())
    }
}

/// Resize `mask` to `width` x `height` (bilinear) unless it already
/// matches.
///
/// # Errors
///
/// Returns [`PipelineError::MaskSize`] if either the mask or the target
/// has a zero dimension while the other does not.
pub fn fit_mask(mask: GrayImage, width: u32, height: u32) -> Result<GrayImage, PipelineError> {
    if mask.dimensions() == (width, height) {
        return Ok(mask);
    }
    if mask.width() == 0 || mask.height() == 0 || width == 0 || height == 0 {
        return Err(PipelineError::MaskSize {
            mask_width: mask.width(),
            mask_height: mask.height(),
            width,
            height,
        });
    }
    tracing::debug!(
        from = ?mask.dimensions(),
        to = ?(width, height),
        "resizing mask to photo"
    );
    Ok(image::imageops::resize(
        &mask,
        width,
        height,
        FilterType::Triangle,
    ))
}
