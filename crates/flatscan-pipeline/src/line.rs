//! Line-angle consistency of a panel crop.
//!
//! Straight structure on a flat panel (mullions, reflections of straight
//! edges) stays straight, so detected segments share a few directions.
//! Distortion scatters them.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use serde::{Deserialize, Serialize};

use crate::hough::{HoughParams, LineSegment, detect_segments};
use crate::stats::mean_std;
use crate::types::{AnalysisKind, AnalysisMetrics, AnalysisResult};

/// Color of detected segments in the visualization.
pub const LINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Settings for the line-angle analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Hough distance resolution, in pixels.
    pub rho: f64,
    /// Hough angle resolution, in radians.
    pub theta: f64,
    /// Accumulator threshold.
    pub votes: u32,
    /// Minimum segment length, in pixels.
    pub min_length: u32,
    /// Maximum gap bridged within one segment, in pixels.
    pub max_gap: u32,
    /// Angle standard deviation (degrees) at or above which the panel is
    /// not flat.
    pub max_angle_std: f64,
    /// Seed for the Hough transform's visiting order.
    pub seed: u64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta: std::f64::consts::PI / 180.0,
            votes: 100,
            min_length: 50,
            max_gap: 10,
            max_angle_std: 50.0,
            seed: 0x5eed,
        }
    }
}

impl LineConfig {
    /// Hough parameters derived from this configuration.
    #[must_use]
    pub const fn hough_params(&self) -> HoughParams {
        HoughParams {
            rho: self.rho,
            theta: self.theta,
            votes: self.votes,
            min_length: self.min_length,
            max_gap: self.max_gap,
            seed: self.seed,
        }
    }
}

/// Detect segments in `edges`, measure the spread of their angles, and draw
/// them onto a copy of `color`.
///
/// No segments gives an angle spread of `0.0`, which classifies as flat.
#[must_use]
pub fn analyze_lines(color: &RgbImage, edges: &GrayImage, config: &LineConfig) -> AnalysisResult {
    let segments = detect_segments(edges, &config.hough_params());
    let angles: Vec<f64> = segments.iter().map(LineSegment::angle_degrees).collect();
    let (_, angle_std) = mean_std(&angles);
    let line_count = segments.len();
    let flat = angle_std < config.max_angle_std;

    let explanation = if flat {
        format!(
            "surface is flat (regular line angles, lines: {line_count}, \
             angle std: {angle_std:.2})"
        )
    } else {
        format!(
            "surface may be uneven (large line angle spread, lines: {line_count}, \
             angle std: {angle_std:.2})"
        )
    };
    tracing::debug!(line_count, angle_std, flat, "line analysis");

    AnalysisResult {
        kind: AnalysisKind::Line,
        flat,
        metrics: AnalysisMetrics::Line {
            line_count,
            angle_std,
        },
        explanation,
        visualization: DynamicImage::ImageRgb8(draw_segments(color, &segments)),
    }
}

/// Copy of `color` with every segment drawn two pixels wide.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn draw_segments(color: &RgbImage, segments: &[LineSegment]) -> RgbImage {
    let mut canvas = color.clone();
    for s in segments {
        let (x1, y1, x2, y2) = (s.x1 as f32, s.y1 as f32, s.x2 as f32, s.y2 as f32);
        draw_line_segment_mut(&mut canvas, (x1, y1), (x2, y2), LINE_COLOR);
        // Second stroke offset across the segment's minor axis.
        let (ox, oy) = if (s.x2 - s.x1).abs() >= (s.y2 - s.y1).abs() {
            (0.0, 1.0)
        } else {
            (1.0, 0.0)
        };
        draw_line_segment_mut(
            &mut canvas,
            (x1 + ox, y1 + oy),
            (x2 + ox, y2 + oy),
            LINE_COLOR,
        );
    }
    canvas
}
