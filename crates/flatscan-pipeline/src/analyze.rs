//! Per-panel analysis: central crop, four independent analyses, and the
//! panel-level majority vote.

use image::RgbImage;

use crate::edge::{analyze_edges, edge_map};
use crate::frequency::analyze_frequency;
use crate::gradient::analyze_gradient;
use crate::grayscale::to_grayscale;
use crate::line::analyze_lines;
use crate::types::{InspectionConfig, PanelVerdict};

/// Discard a `ratio` border on every side of `image`.
///
/// Bounds truncate: rows `floor(h * ratio)..floor(h * (1 - ratio))` and
/// the same for columns. The result may be empty for tiny inputs.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn crop_central(image: &RgbImage, ratio: f64) -> RgbImage {
    let (w, h) = image.dimensions();
    let lo = |n: u32| (f64::from(n) * ratio) as u32;
    let hi = |n: u32| ((f64::from(n) * (1.0 - ratio)) as u32).min(n);
    let (left, right) = (lo(w), hi(w));
    let (top, bottom) = (lo(h), hi(h));
    if right <= left || bottom <= top {
        return RgbImage::new(0, 0);
    }
    image::imageops::crop_imm(image, left, top, right - left, bottom - top).to_image()
}

/// `true` when more than half of `votes` are `true`. No votes is not a
/// majority.
#[must_use]
pub fn majority_vote(votes: &[bool]) -> bool {
    let flat = votes.iter().filter(|&&v| v).count();
    flat * 2 > votes.len()
}

/// Run all four analyses on an already-cropped panel interior.
///
/// Each analysis reads the same grayscale copy (the line overlay draws on
/// `crop` itself). Nothing here is random beyond the seeded Hough order,
/// so equal input gives equal output.
#[must_use]
pub fn analyze_crop(crop: &RgbImage, config: &InspectionConfig) -> PanelVerdict {
    let gray = to_grayscale(crop);
    let edges = edge_map(&gray, &config.edge);

    let edge = analyze_edges(&gray, &edges, &config.edge);
    let line = analyze_lines(crop, &edges, &config.line);
    let gradient = analyze_gradient(&gray, &config.gradient);
    let frequency = analyze_frequency(&gray, &config.frequency);

    let mut verdict = PanelVerdict {
        edge,
        line,
        gradient,
        frequency,
        flat: false,
    };
    let ballots: Vec<bool> = verdict
        .results()
        .into_iter()
        .filter(|r| r.kind.votes())
        .map(|r| r.flat)
        .collect();
    verdict.flat = majority_vote(&ballots);
    verdict
}

/// Crop `panel` to its interior and analyze it.
#[must_use]
pub fn analyze_panel(panel: &RgbImage, config: &InspectionConfig) -> PanelVerdict {
    analyze_crop(&crop_central(panel, config.border_ratio), config)
}
