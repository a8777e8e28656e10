//! Edge density and Laplacian sharpness of a panel crop.
//!
//! A low Laplacian variance means the crop is blurred or washed out. That
//! is a property of the photograph rather than of the glass, so this
//! result is reported alongside the others but does not vote.

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

use crate::canny::{canny, count_edge_pixels};
use crate::stats::mean_variance;
use crate::types::{AnalysisKind, AnalysisMetrics, AnalysisResult};

/// Settings for the edge/sharpness analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
    /// Laplacian variance below which the crop counts as blurred.
    pub blur_variance: f64,
    /// Edge-pixel count below which a sharp crop is a plain background.
    pub min_edge_pixels: u64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            blur_variance: 10.0,
            min_edge_pixels: 500,
        }
    }
}

/// Which branch of the sharpness decision a crop took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sharpness {
    /// Laplacian variance strictly below the blur threshold.
    Blurred,
    /// Sharp, but with fewer edge pixels than the minimum.
    PlainBackground,
    /// Sharp with a normal amount of edges.
    Normal,
}

impl Sharpness {
    /// Whether this branch reports the panel as flat.
    #[must_use]
    pub const fn is_flat(self) -> bool {
        !matches!(self, Self::Blurred)
    }
}

/// Decide the sharpness branch from the two metrics.
///
/// The blur test is strict: a variance exactly equal to
/// `config.blur_variance` is sharp.
#[must_use]
pub fn classify_sharpness(
    laplacian_variance: f64,
    edge_pixel_count: u64,
    config: &EdgeConfig,
) -> Sharpness {
    if laplacian_variance < config.blur_variance {
        Sharpness::Blurred
    } else if edge_pixel_count < config.min_edge_pixels {
        Sharpness::PlainBackground
    } else {
        Sharpness::Normal
    }
}

/// Population variance of the 4-neighbour Laplacian of `gray`.
///
/// The border is reflected without repeating the edge pixel (`b|abcd|c`).
/// Returns `0.0` for an empty image.
#[must_use]
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }
    let padded = GrayImage::from_fn(width + 2, height + 2, |x, y| {
        *gray.get_pixel(reflect_101(x, width), reflect_101(y, height))
    });
    let laplacian = imageproc::filter::laplacian_filter(&padded);
    let values: Vec<f64> = (1..=height)
        .flat_map(|y| (1..=width).map(move |x| (x, y)))
        .map(|(x, y)| f64::from(laplacian.get_pixel(x, y).0[0]))
        .collect();
    mean_variance(&values).1
}

/// Source index for index `i` of a side of length `n` padded by one pixel.
const fn reflect_101(i: u32, n: u32) -> u32 {
    if n == 1 {
        0
    } else if i == 0 {
        1
    } else if i > n {
        n - 2
    } else {
        i - 1
    }
}

/// Canny edge map of `gray` with the configured thresholds.
///
/// Shared by the sharpness and line-angle analyses.
#[must_use = "returns the binary edge map"]
pub fn edge_map(gray: &GrayImage, config: &EdgeConfig) -> GrayImage {
    canny(gray, config.canny_low, config.canny_high)
}

/// Classify `gray` from its Laplacian and its Canny edge map `edges`.
///
/// The visualization is the edge map itself.
#[must_use]
pub fn analyze_edges(gray: &GrayImage, edges: &GrayImage, config: &EdgeConfig) -> AnalysisResult {
    let edge_pixel_count = count_edge_pixels(edges);
    let variance = laplacian_variance(gray);
    let sharpness = classify_sharpness(variance, edge_pixel_count, config);

    let explanation = match sharpness {
        Sharpness::Blurred => format!(
            "surface may be uneven (blurred edges, Laplacian variance: {variance:.2}, \
             edge pixels: {edge_pixel_count})"
        ),
        Sharpness::PlainBackground => format!(
            "surface is flat (sharp but plain background, Laplacian variance: {variance:.2}, \
             edge pixels: {edge_pixel_count})"
        ),
        Sharpness::Normal => format!(
            "surface is flat (clear and regular edges, Laplacian variance: {variance:.2}, \
             edge pixels: {edge_pixel_count})"
        ),
    };
    tracing::debug!(
        laplacian_variance = variance,
        edge_pixel_count,
        ?sharpness,
        "edge analysis"
    );

    AnalysisResult {
        kind: AnalysisKind::Edge,
        flat: sharpness.is_flat(),
        metrics: AnalysisMetrics::Edge {
            laplacian_variance: variance,
            edge_pixel_count,
        },
        explanation,
        visualization: DynamicImage::ImageLuma8(edges.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Zero image with a single interior pixel of value 10. The Laplacian
    /// is -40 at the pixel and 10 at its four neighbours, so the sum of
    /// squares is 2000 and the mean is zero.
    fn single_spike(width: u32, height: u32, x: u32, y: u32) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        img.put_pixel(x, y, Luma([10]));
        img
    }

    fn analyze(img: &GrayImage) -> AnalysisResult {
        let config = EdgeConfig::default();
        analyze_edges(img, &edge_map(img, &config), &config)
    }

    #[test]
    fn laplacian_variance_of_spike_is_exact() {
        // 200 pixels: 2000 / 200 = 10.0 exactly.
        let v = laplacian_variance(&single_spike(10, 20, 5, 10));
        assert!((v - 10.0).abs() < f64::EPSILON, "got {v}");
    }

    #[test]
    fn variance_exactly_at_threshold_is_sharp() {
        let img = single_spike(10, 20, 5, 10);
        let result = analyze(&img);
        assert!(result.flat);
        assert!(result.explanation.contains("plain background"));
    }

    #[test]
    fn variance_just_below_threshold_is_blurred() {
        // 203 pixels: 2000 / 203 < 10.
        let img = single_spike(7, 29, 3, 14);
        let v = laplacian_variance(&img);
        assert!(v < 10.0 && v > 9.8, "got {v}");
        let result = analyze(&img);
        assert!(!result.flat);
        assert!(result.explanation.contains("blurred"));
    }

    #[test]
    fn border_reflects_without_repeating_edge() {
        // Spike on the left edge: its mirrored neighbour is the zero at
        // x = 1, so the Laplacian there is -40 rather than -30. Values
        // -40, 10, 10, 10 over 25 pixels.
        let v = laplacian_variance(&single_spike(5, 5, 0, 2));
        assert!((v - 75.84).abs() < 1e-9, "got {v}");
    }

    #[test]
    fn decision_branches() {
        let config = EdgeConfig::default();
        assert_eq!(classify_sharpness(9.999, 10_000, &config), Sharpness::Blurred);
        assert_eq!(
            classify_sharpness(10.0, 499, &config),
            Sharpness::PlainBackground
        );
        assert_eq!(classify_sharpness(10.0, 500, &config), Sharpness::Normal);
        assert!(!Sharpness::Blurred.is_flat());
        assert!(Sharpness::PlainBackground.is_flat());
        assert!(Sharpness::Normal.is_flat());
    }

    #[test]
    fn uniform_crop_is_blurred_with_no_edges() {
        let img = GrayImage::from_pixel(50, 50, Luma([255]));
        let result = analyze(&img);
        assert!(!result.flat);
        assert_eq!(
            result.metrics,
            AnalysisMetrics::Edge {
                laplacian_variance: 0.0,
                edge_pixel_count: 0,
            }
        );
    }

    #[test]
    fn checkerboard_is_sharp_with_many_edges() {
        let img = GrayImage::from_fn(100, 100, |x, y| {
            if (x / 5 + y / 5) % 2 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        let result = analyze(&img);
        assert!(result.flat);
        match result.metrics {
            AnalysisMetrics::Edge {
                laplacian_variance,
                edge_pixel_count,
            } => {
                assert!(laplacian_variance > 10.0);
                assert!(edge_pixel_count >= 500, "got {edge_pixel_count}");
            }
            other => unreachable!("unexpected metrics {other:?}"),
        }
    }

    #[test]
    fn empty_crop_falls_back_to_blurred() {
        let result = analyze(&GrayImage::new(0, 0));
        assert!(!result.flat);
        assert!(result.metric().abs() < f64::EPSILON);
    }

    #[test]
    fn visualization_is_edge_map() {
        let img = GrayImage::from_pixel(12, 9, Luma([0]));
        let result = analyze(&img);
        assert_eq!(result.kind, AnalysisKind::Edge);
        assert_eq!((result.visualization.width(), result.visualization.height()), (12, 9));
    }
}
