//! Sobel gradient-magnitude spread of a panel crop.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use serde::{Deserialize, Serialize};

use crate::stats::mean_std;
use crate::types::{AnalysisKind, AnalysisMetrics, AnalysisResult};

/// Settings for the gradient analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientConfig {
    /// Magnitude standard deviation at or above which the panel is not
    /// flat.
    pub max_std: f64,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self { max_std: 100.0 }
    }
}

/// Per-pixel Euclidean norm of the 3x3 Sobel responses.
///
/// Row-major, one value per pixel of `gray`.
#[must_use]
pub fn gradient_magnitude(gray: &GrayImage) -> Vec<f64> {
    if gray.width() == 0 || gray.height() == 0 {
        return Vec::new();
    }
    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);
    gx.pixels()
        .zip(gy.pixels())
        .map(|(h, v)| f64::from(h.0[0]).hypot(f64::from(v.0[0])))
        .collect()
}

/// Classify `gray` by the spread of its gradient magnitude.
///
/// The visualization is the magnitude map clipped to `0..=255`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn analyze_gradient(gray: &GrayImage, config: &GradientConfig) -> AnalysisResult {
    let magnitude = gradient_magnitude(gray);
    let (mean, std) = mean_std(&magnitude);
    let flat = std < config.max_std;

    let explanation = if flat {
        format!("surface is flat (regular gradient, mean: {mean:.2}, std: {std:.2})")
    } else {
        format!("surface may be uneven (large gradient spread, mean: {mean:.2}, std: {std:.2})")
    };
    tracing::debug!(mean, std, flat, "gradient analysis");

    let width = gray.width();
    let visualization = GrayImage::from_fn(width, gray.height(), |x, y| {
        let m = magnitude[(y as usize) * (width as usize) + x as usize];
        Luma([m.clamp(0.0, 255.0) as u8])
    });

    AnalysisResult {
        kind: AnalysisKind::Gradient,
        flat,
        metrics: AnalysisMetrics::Gradient { mean, std },
        explanation,
        visualization: DynamicImage::ImageLuma8(visualization),
    }
}
