//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) for the photo and the
//! boundary mask, and converts color crops to the single-channel images
//! the analyses run on.

use image::{GrayImage, Luma, RgbImage};

use crate::types::PipelineError;

/// Decode raw photo bytes into an RGB image.
///
/// Any alpha channel is discarded.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded photo"]
pub fn decode_photo(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Decode raw mask bytes into a single-channel image.
///
/// Color masks are reduced with [`to_grayscale`] weights so that a pure
/// white mask pixel stays at 255.
///
/// # Errors
///
/// Same conditions as [`decode_photo`].
#[must_use = "returns the decoded mask"]
pub fn decode_mask(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    let decoded = image::load_from_memory(bytes)?;
    Ok(match decoded {
        image::DynamicImage::ImageLuma8(gray) => gray,
        other => to_grayscale(&other.to_rgb8()),
    })
}

/// Convert an RGB image to grayscale with the BT.601 luma weights
/// `0.299*R + 0.587*G + 0.114*B`, rounded to nearest.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let weighted = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
        // 255 * 1000 + 500 still divides to 255.
        #[allow(clippy::cast_possible_truncation)]
        let luma = ((weighted + 500) / 1000) as u8;
        Luma([luma])
    })
}
