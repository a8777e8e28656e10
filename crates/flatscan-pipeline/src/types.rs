//! Shared types for the flatscan inspection pipeline.

use serde::{Deserialize, Serialize};

use crate::edge::EdgeConfig;
use crate::frequency::FrequencyConfig;
use crate::gradient::GradientConfig;
use crate::line::LineConfig;
use crate::render::OverlayConfig;
use crate::segment::SegmentConfig;

/// Re-export `GrayImage` so downstream crates can reference masks and
/// diagnostic rasters without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` for photos, panel crops, and the composite.
pub use image::RgbImage;

/// Re-export `DynamicImage`, the type of every diagnostic visualization.
pub use image::DynamicImage;

/// Axis-aligned rectangle in original-image pixel coordinates.
///
/// Always lies fully inside the image it was derived from:
/// `x + width <= image_width` and `y + height <= image_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge (pixels from the left of the image).
    pub x: u32,
    /// Top edge (pixels from the top of the image).
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Create a new bounding box.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in square pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Exclusive right edge (`x + width`).
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge (`y + height`).
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Returns `true` if the box lies entirely inside a `width` x `height` image.
    #[must_use]
    pub const fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// One candidate glass panel cut out of the original photo.
#[derive(Debug, Clone)]
pub struct Panel {
    /// Position in contour-discovery order.
    pub index: usize,
    /// Location in the original photo.
    pub bbox: BoundingBox,
    /// Pixels of the original photo inside `bbox`.
    pub image: RgbImage,
}

/// Which of the four per-panel analyses produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisKind {
    /// Canny edge density and Laplacian sharpness.
    Edge,
    /// Probabilistic Hough line-angle spread.
    Line,
    /// Sobel gradient-magnitude spread.
    Gradient,
    /// Log-magnitude spectrum range.
    Frequency,
}

impl AnalysisKind {
    /// All kinds, in reporting order.
    pub const ALL: [Self; 4] = [Self::Edge, Self::Line, Self::Gradient, Self::Frequency];

    /// The `kind` part of the `{panel_id}-{kind}.jpg` file name.
    #[must_use]
    pub const fn file_suffix(self) -> &'static str {
        match self {
            Self::Edge => "edges",
            Self::Line => "lines",
            Self::Gradient => "gradient",
            Self::Frequency => "frequency",
        }
    }

    /// Whether this analysis participates in the panel majority vote.
    ///
    /// Sharpness reflects photography quality rather than physical
    /// flatness, so the edge result is reported but never counted.
    #[must_use]
    pub const fn votes(self) -> bool {
        !matches!(self, Self::Edge)
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Edge => "edge",
            Self::Line => "line",
            Self::Gradient => "gradient",
            Self::Frequency => "frequency",
        };
        f.write_str(name)
    }
}

/// Numeric diagnostics behind one analysis verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AnalysisMetrics {
    /// Edge/sharpness analysis.
    Edge {
        /// Variance of the Laplacian of the grayscale crop.
        laplacian_variance: f64,
        /// Number of Canny edge pixels.
        edge_pixel_count: u64,
    },
    /// Line-angle analysis.
    Line {
        /// Number of detected line segments.
        line_count: usize,
        /// Population standard deviation of segment angles, in degrees.
        angle_std: f64,
    },
    /// Gradient-magnitude analysis.
    Gradient {
        /// Mean Sobel gradient magnitude.
        mean: f64,
        /// Population standard deviation of the gradient magnitude.
        std: f64,
    },
    /// Frequency-domain analysis.
    Frequency {
        /// Largest log-magnitude value.
        max: f64,
        /// Smallest log-magnitude value.
        min: f64,
        /// `max - min`.
        range: f64,
    },
}

impl AnalysisMetrics {
    /// The metric the verdict was decided on.
    #[must_use]
    pub const fn primary(&self) -> f64 {
        match *self {
            Self::Edge {
                laplacian_variance, ..
            } => laplacian_variance,
            Self::Line { angle_std, .. } => angle_std,
            Self::Gradient { std, .. } => std,
            Self::Frequency { range, .. } => range,
        }
    }
}

/// Outcome of one analysis on one panel. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Which analysis produced this result.
    pub kind: AnalysisKind,
    /// `true` when the analysis considers the panel flat.
    pub flat: bool,
    /// Diagnostic numbers behind the verdict.
    pub metrics: AnalysisMetrics,
    /// Human-readable explanation including the metrics.
    pub explanation: String,
    /// In-memory diagnostic rendering (edge map, line overlay, gradient
    /// magnitude, or spectrum).
    pub visualization: DynamicImage,
}

impl AnalysisResult {
    /// The metric the verdict was decided on.
    #[must_use]
    pub const fn metric(&self) -> f64 {
        self.metrics.primary()
    }
}

/// The four analyses of one panel fused into a single verdict.
#[derive(Debug, Clone)]
pub struct PanelVerdict {
    /// Sharpness result (reported, not voted).
    pub edge: AnalysisResult,
    /// Line-angle result.
    pub line: AnalysisResult,
    /// Gradient result.
    pub gradient: AnalysisResult,
    /// Frequency result.
    pub frequency: AnalysisResult,
    /// Majority of `line`, `gradient`, and `frequency`.
    pub flat: bool,
}

impl PanelVerdict {
    /// Borrow the result for a given analysis kind.
    #[must_use]
    pub const fn result(&self, kind: AnalysisKind) -> &AnalysisResult {
        match kind {
            AnalysisKind::Edge => &self.edge,
            AnalysisKind::Line => &self.line,
            AnalysisKind::Gradient => &self.gradient,
            AnalysisKind::Frequency => &self.frequency,
        }
    }

    /// All four results in reporting order.
    #[must_use]
    pub const fn results(&self) -> [&AnalysisResult; 4] {
        [&self.edge, &self.line, &self.gradient, &self.frequency]
    }
}

/// Image-level verdict: flat only when every panel is flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageVerdict {
    /// Every panel was judged flat.
    Flat,
    /// At least one panel was judged not flat.
    NotFlat,
}

impl ImageVerdict {
    /// Persisted integer flag: `1` = flat, `0` = not flat.
    #[must_use]
    pub const fn as_flag(self) -> u8 {
        match self {
            Self::Flat => 1,
            Self::NotFlat => 0,
        }
    }

    /// User-facing result string.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Flat => "平整",
            Self::NotFlat => "不平整",
        }
    }

    /// Returns `true` for [`ImageVerdict::Flat`].
    #[must_use]
    pub const fn is_flat(self) -> bool {
        matches!(self, Self::Flat)
    }
}

/// Configuration for the whole inspection.
///
/// Defaults reproduce the reference thresholds. Per-stage settings live
/// next to the stage that uses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// Region segmentation (mask threshold, padding, minimum area).
    pub segment: SegmentConfig,
    /// Fraction of each panel dimension discarded on every side before
    /// analysis.
    pub border_ratio: f64,
    /// Edge/sharpness analysis.
    pub edge: EdgeConfig,
    /// Line-angle analysis.
    pub line: LineConfig,
    /// Gradient-magnitude analysis.
    pub gradient: GradientConfig,
    /// Frequency-domain analysis.
    pub frequency: FrequencyConfig,
    /// Result overlay rendering.
    pub overlay: OverlayConfig,
}

impl InspectionConfig {
    /// Default panel border ratio.
    pub const DEFAULT_BORDER_RATIO: f64 = 0.1;

    /// Check every field for values the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        check_ratio("segment.padding_ratio", self.segment.padding_ratio)?;
        check_ratio("border_ratio", self.border_ratio)?;

        let edge = &self.edge;
        if !(edge.canny_low.is_finite() && edge.canny_high.is_finite()) {
            return Err(invalid("edge canny thresholds must be finite"));
        }
        if edge.canny_low > edge.canny_high {
            return Err(invalid("edge.canny_low must not exceed edge.canny_high"));
        }
        check_finite("edge.blur_variance", edge.blur_variance)?;

        let line = &self.line;
        if !(line.rho.is_finite() && line.rho > 0.0) {
            return Err(invalid("line.rho must be positive"));
        }
        if !(line.theta.is_finite() && line.theta > 0.0 && line.theta <= std::f64::consts::PI) {
            return Err(invalid("line.theta must be in (0, pi]"));
        }
        if line.votes == 0 {
            return Err(invalid("line.votes must be at least 1"));
        }
        check_finite("line.max_angle_std", line.max_angle_std)?;
        check_finite("gradient.max_std", self.gradient.max_std)?;
        check_finite("frequency.threshold", self.frequency.threshold)?;
        if !(self.frequency.epsilon.is_finite() && self.frequency.epsilon > 0.0) {
            return Err(invalid("frequency.epsilon must be positive"));
        }
        if !self.overlay.outline_width.is_finite() || self.overlay.outline_width < 0.0 {
            return Err(invalid("overlay.outline_width must be non-negative"));
        }
        Ok(())
    }
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            segment: SegmentConfig::default(),
            border_ratio: Self::DEFAULT_BORDER_RATIO,
            edge: EdgeConfig::default(),
            line: LineConfig::default(),
            gradient: GradientConfig::default(),
            frequency: FrequencyConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

fn invalid(message: &str) -> PipelineError {
    PipelineError::InvalidConfig(message.to_string())
}

fn check_finite(name: &str, value: f64) -> Result<(), PipelineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PipelineError::InvalidConfig(format!("{name} must be finite")))
    }
}

fn check_ratio(name: &str, value: f64) -> Result<(), PipelineError> {
    if (0.0..0.5).contains(&value) {
        Ok(())
    } else {
        Err(PipelineError::InvalidConfig(format!(
            "{name} must be in [0, 0.5), got {value}"
        )))
    }
}

/// Errors that can occur during an inspection.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Inspection configuration is invalid.
    #[error("invalid inspection configuration: {0}")]
    InvalidConfig(String),

    /// The boundary mask cannot be matched to the photo.
    #[error("mask of {mask_width}x{mask_height} cannot be fitted to photo of {width}x{height}")]
    MaskSize {
        /// Mask width in pixels.
        mask_width: u32,
        /// Mask height in pixels.
        mask_height: u32,
        /// Photo width in pixels.
        width: u32,
        /// Photo height in pixels.
        height: u32,
    },

    /// The boundary predictor failed to produce a mask.
    #[error("boundary prediction failed: {0}")]
    Predictor(String),

    /// Segmentation found no panel candidates.
    #[error("no panels detected in the image")]
    NoPanelsDetected,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_edges_and_area() {
        let b = BoundingBox::new(10, 20, 30, 40);
        assert_eq!(b.right(), 40);
        assert_eq!(b.bottom(), 60);
        assert_eq!(b.area(), 1200);
        assert!(b.fits_within(40, 60));
        assert!(!b.fits_within(39, 60));
        assert!(!b.fits_within(40, 59));
    }

    #[test]
    fn analysis_kind_file_suffixes() {
        let suffixes: Vec<_> = AnalysisKind::ALL.iter().map(|k| k.file_suffix()).collect();
        assert_eq!(suffixes, ["edges", "lines", "gradient", "frequency"]);
    }

    #[test]
    fn only_edge_is_excluded_from_vote() {
        assert!(!AnalysisKind::Edge.votes());
        assert!(AnalysisKind::Line.votes());
        assert!(AnalysisKind::Gradient.votes());
        assert!(AnalysisKind::Frequency.votes());
    }

    #[test]
    fn primary_metric_per_kind() {
        let edge = AnalysisMetrics::Edge {
            laplacian_variance: 12.5,
            edge_pixel_count: 3,
        };
        let line = AnalysisMetrics::Line {
            line_count: 2,
            angle_std: 7.0,
        };
        let gradient = AnalysisMetrics::Gradient {
            mean: 1.0,
            std: 2.0,
        };
        let frequency = AnalysisMetrics::Frequency {
            max: 10.0,
            min: 4.0,
            range: 6.0,
        };
        assert!((edge.primary() - 12.5).abs() < f64::EPSILON);
        assert!((line.primary() - 7.0).abs() < f64::EPSILON);
        assert!((gradient.primary() - 2.0).abs() < f64::EPSILON);
        assert!((frequency.primary() - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn image_verdict_flags_and_labels() {
        assert_eq!(ImageVerdict::Flat.as_flag(), 1);
        assert_eq!(ImageVerdict::NotFlat.as_flag(), 0);
        assert_eq!(ImageVerdict::Flat.label(), "平整");
        assert_eq!(ImageVerdict::NotFlat.label(), "不平整");
    }

    #[test]
    fn inspection_config_defaults_match_reference_thresholds() {
        let config = InspectionConfig::default();
        assert_eq!(config.segment.mask_threshold, 200);
        assert!((config.segment.padding_ratio - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.segment.min_area, 200);
        assert!((config.border_ratio - 0.1).abs() < f64::EPSILON);
        assert!((config.edge.canny_low - 50.0).abs() < f32::EPSILON);
        assert!((config.edge.canny_high - 150.0).abs() < f32::EPSILON);
        assert!((config.edge.blur_variance - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.edge.min_edge_pixels, 500);
        assert_eq!(config.line.votes, 100);
        assert_eq!(config.line.min_length, 50);
        assert_eq!(config.line.max_gap, 10);
        assert!((config.line.max_angle_std - 50.0).abs() < f64::EPSILON);
        assert!((config.gradient.max_std - 100.0).abs() < f64::EPSILON);
        assert!((config.frequency.threshold - 400.0).abs() < f64::EPSILON);
        assert_eq!(config.overlay.alpha, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_canny_thresholds() {
        let mut config = InspectionConfig::default();
        config.edge.canny_low = 200.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(ref s) if s.contains("canny_low")));
    }

    #[test]
    fn validate_rejects_border_ratio_of_one_half() {
        let config = InspectionConfig {
            border_ratio: 0.5,
            ..InspectionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_hough_votes() {
        let mut config = InspectionConfig::default();
        config.line.votes = 0;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn inspection_config_serde_round_trip() {
        let mut config = InspectionConfig::default();
        config.frequency.threshold = 350.0;
        config.segment.min_area = 1000;
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: InspectionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn partial_config_json_fills_defaults() {
        let config: InspectionConfig =
            serde_json::from_str(r#"{"gradient": {"max_std": 80.0}}"#).unwrap();
        assert!((config.gradient.max_std - 80.0).abs() < f64::EPSILON);
        assert_eq!(config.line, LineConfig::default());
    }

    #[test]
    fn error_no_panels_display() {
        assert_eq!(
            PipelineError::NoPanelsDetected.to_string(),
            "no panels detected in the image"
        );
    }

    #[test]
    fn error_mask_size_display() {
        let err = PipelineError::MaskSize {
            mask_width: 0,
            mask_height: 0,
            width: 10,
            height: 20,
        };
        assert_eq!(
            err.to_string(),
            "mask of 0x0 cannot be fitted to photo of 10x20"
        );
    }
}
