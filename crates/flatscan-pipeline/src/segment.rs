//! Region segmentation: turn a boundary mask into padded panel crops.
//!
//! The mask is thresholded into a strict binary image, the outer border of
//! every foreground component is traced with Suzuki-Abe border following
//! ([`imageproc::contours::find_contours`]), and each border's bounding
//! box is padded, clamped to the photo, filtered by area, and cropped out
//! of the photo.
//!
//! Holes and components nested inside holes are ignored. Overlapping boxes
//! are not merged: every outer border yields its own panel.

use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{BorderType, Contour, find_contours};
use serde::{Deserialize, Serialize};

use crate::types::{BoundingBox, Panel, PipelineError};

/// Foreground value in the thresholded mask.
const FOREGROUND: u8 = 255;

/// Settings for region segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Mask intensity at or above which a pixel is inside a panel.
    pub mask_threshold: u8,
    /// Fraction of a box's own width/height added on each side.
    pub padding_ratio: f64,
    /// Padded boxes with a smaller area (square pixels) are discarded.
    pub min_area: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            mask_threshold: 200,
            padding_ratio: 0.1,
            min_area: 200,
        }
    }
}

/// Binarize `mask`: pixels `>= threshold` become 255, the rest 0.
#[must_use = "returns the binary mask"]
pub fn threshold_mask(mask: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] >= threshold {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

/// Bounding boxes (inclusive of both extremes) of the outer borders of
/// all top-level foreground components of a binary image, in discovery
/// (raster) order.
///
/// Border following only starts an outer border at a background-to-
/// foreground transition, so the image is traced inside a one-pixel
/// background frame. Components touching the image edge are found like
/// any other.
#[must_use]
pub fn find_regions(binary: &GrayImage) -> Vec<BoundingBox> {
    let (width, height) = binary.dimensions();
    let mut framed = GrayImage::new(width + 2, height + 2);
    image::imageops::replace(&mut framed, binary, 1, 1);

    let contours: Vec<Contour<u32>> = find_contours(&framed);
    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            let points: Vec<(u32, u32)> = c.points.iter().map(|p| (p.x - 1, p.y - 1)).collect();
            points_bounding_box(&points)
        })
        .collect()
}

/// Tight inclusive bounding box of a point set, or `None` when empty.
fn points_bounding_box(points: &[(u32, u32)]) -> Option<BoundingBox> {
    let (&(x0, y0), rest) = points.split_first()?;
    let (min_x, min_y, max_x, max_y) = rest.iter().fold(
        (x0, y0, x0, y0),
        |(min_x, min_y, max_x, max_y), &(x, y)| {
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        },
    );
    Some(BoundingBox::new(
        min_x,
        min_y,
        max_x - min_x + 1,
        max_y - min_y + 1,
    ))
}

/// Pad `bbox` by `ratio` of its own size on each side, clamped to a
/// `width` x `height` image.
///
/// The padding is truncated to whole pixels. The origin is clamped at
/// zero and the size is then clamped to the remaining image extent, so
/// the result always fits within the image.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn expand_bounding_box(bbox: BoundingBox, width: u32, height: u32, ratio: f64) -> BoundingBox {
    let pad_w = (f64::from(bbox.width) * ratio) as u32;
    let pad_h = (f64::from(bbox.height) * ratio) as u32;
    let x = bbox.x.saturating_sub(pad_w).min(width);
    let y = bbox.y.saturating_sub(pad_h).min(height);
    let w = bbox
        .width
        .saturating_add(pad_w.saturating_mul(2))
        .min(width - x);
    let h = bbox
        .height
        .saturating_add(pad_h.saturating_mul(2))
        .min(height - y);
    BoundingBox::new(x, y, w, h)
}

/// Extract panel candidates from `photo` using a boundary `mask` of the
/// same dimensions.
///
/// Panels are returned in contour-discovery order and indexed from zero
/// after the area filter. An empty result is not an error here; callers
/// decide how to report it.
///
/// # Errors
///
/// Returns [`PipelineError::MaskSize`] if the mask and photo dimensions
/// differ.
pub fn segment_panels(
    photo: &RgbImage,
    mask: &GrayImage,
    config: &SegmentConfig,
) -> Result<Vec<Panel>, PipelineError> {
    let (width, height) = photo.dimensions();
    if mask.dimensions() != (width, height) {
        return Err(PipelineError::MaskSize {
            mask_width: mask.width(),
            mask_height: mask.height(),
            width,
            height,
        });
    }

    let binary = threshold_mask(mask, config.mask_threshold);
    let regions = find_regions(&binary);
    tracing::debug!(regions = regions.len(), "traced mask regions");

    let panels: Vec<Panel> = regions
        .iter()
        .map(|&bbox| expand_bounding_box(bbox, width, height, config.padding_ratio))
        .filter(|bbox| {
            let keep = bbox.area() >= config.min_area;
            if !keep {
                tracing::trace!(?bbox, "discarding small region");
            }
            keep
        })
        .enumerate()
        .map(|(index, bbox)| Panel {
            index,
            bbox,
            image: image::imageops::crop_imm(photo, bbox.x, bbox.y, bbox.width, bbox.height)
                .to_image(),
        })
        .collect();

    tracing::debug!(panels = panels.len(), "segmented panels");
    Ok(panels)
}
