//! Inspection diagnostics: timing, counts, and metrics for each stage.
//!
//! Every call to [`inspect_with_diagnostics`](crate::inspect_with_diagnostics)
//! collects these alongside the verdicts. They are intended for threshold
//! tuning and for spotting slow stages on large photos.
//!
//! Durations are [`std::time::Duration`] values measured through a
//! [`Clock`], so callers (and tests) decide where time comes from.
//! They are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::types::{AnalysisMetrics, BoundingBox, ImageVerdict};

/// Source of monotonic timestamps.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// [`Clock`] backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock whose origin is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionDiagnostics {
    /// Image decoding; `None` when the caller passed decoded images.
    pub decode: Option<StageDiagnostics>,
    /// Boundary prediction and mask fitting.
    pub predict: StageDiagnostics,
    /// Region segmentation.
    pub segment: StageDiagnostics,
    /// One entry per panel, in panel order.
    pub panels: Vec<PanelDiagnostics>,
    /// Image-level reduction.
    pub aggregate: StageDiagnostics,
    /// Overlay rendering.
    pub render: StageDiagnostics,
    /// Total wall-clock duration of the inspection (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: InspectionSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Photo decoding.
    Decode {
        /// Size of the photo bytes.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },
    /// Boundary prediction.
    Predict {
        /// Width of the predicted mask before fitting.
        mask_width: u32,
        /// Height of the predicted mask before fitting.
        mask_height: u32,
        /// Whether the mask had to be resized to the photo.
        resized: bool,
    },
    /// Region segmentation.
    Segment {
        /// Panels that survived the area filter.
        panel_count: usize,
        /// Sum of panel box areas, in square pixels.
        covered_area: u64,
    },
    /// Image-level reduction.
    Aggregate {
        /// Panels considered.
        panel_count: usize,
        /// Panels judged flat.
        flat_panel_count: usize,
    },
    /// Overlay rendering.
    Render {
        /// Overlay width in pixels.
        width: u32,
        /// Overlay height in pixels.
        height: u32,
    },
}

/// Diagnostics for one analyzed panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelDiagnostics {
    /// Panel index.
    pub index: usize,
    /// Panel box in the photo.
    pub bbox: BoundingBox,
    /// Wall-clock duration of crop plus the four analyses (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Edge/sharpness metrics.
    pub edge: AnalysisMetrics,
    /// Line-angle metrics.
    pub line: AnalysisMetrics,
    /// Gradient metrics.
    pub gradient: AnalysisMetrics,
    /// Frequency metrics.
    pub frequency: AnalysisMetrics,
    /// Panel verdict.
    pub flat: bool,
}

/// High-level summary of the inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionSummary {
    /// Photo width in pixels.
    pub image_width: u32,
    /// Photo height in pixels.
    pub image_height: u32,
    /// Number of panels analyzed.
    pub panel_count: usize,
    /// Number of panels judged flat.
    pub flat_panel_count: usize,
    /// Image verdict.
    pub verdict: ImageVerdict,
}

impl InspectionDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Inspection Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}  |  Panels: {} ({} flat)  |  Result: {}",
            self.summary.image_width,
            self.summary.image_height,
            self.summary.panel_count,
            self.summary.flat_panel_count,
            self.summary.verdict.label(),
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let analyze_duration: Duration = self.panels.iter().map(|p| p.duration).sum();

        let mut stages: Vec<(&str, Duration, String)> = Vec::new();
        if let Some(ref decode) = self.decode {
            stages.push(("Decode", decode.duration, format_metrics(&decode.metrics)));
        }
        for (name, diag) in [("Predict", &self.predict), ("Segment", &self.segment)] {
            stages.push((name, diag.duration, format_metrics(&diag.metrics)));
        }
        stages.push((
            "Analyze",
            analyze_duration,
            format!("{} panels", self.panels.len()),
        ));
        for (name, diag) in [("Aggregate", &self.aggregate), ("Render", &self.render)] {
            stages.push((name, diag.duration, format_metrics(&diag.metrics)));
        }

        for (name, duration, details) in &stages {
            let ms = duration_ms(*duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        if !self.panels.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "{:<6} {:<22} {:>10} {:>10} {:>6} {:>10} {:>10} {:>10}  {}",
                "Panel", "Box", "Lap.var", "Edges", "Lines", "Angle std", "Grad std", "Freq rng",
                "Flat"
            ));
            lines.push("-".repeat(100));
            for panel in &self.panels {
                lines.push(format_panel(panel));
            }
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Predict {
            mask_width,
            mask_height,
            resized,
        } => {
            if *resized {
                format!("mask {mask_width}x{mask_height} (resized)")
            } else {
                format!("mask {mask_width}x{mask_height}")
            }
        }
        StageMetrics::Segment {
            panel_count,
            covered_area,
        } => format!("panels={panel_count} area={covered_area}px"),
        StageMetrics::Aggregate {
            panel_count,
            flat_panel_count,
        } => format!("{flat_panel_count}/{panel_count} flat"),
        StageMetrics::Render { width, height } => format!("{width}x{height}"),
    }
}

fn format_panel(panel: &PanelDiagnostics) -> String {
    let (variance, edges) = match panel.edge {
        AnalysisMetrics::Edge {
            laplacian_variance,
            edge_pixel_count,
        } => (laplacian_variance, edge_pixel_count),
        _ => (0.0, 0),
    };
    let (line_count, angle_std) = match panel.line {
        AnalysisMetrics::Line {
            line_count,
            angle_std,
        } => (line_count, angle_std),
        _ => (0, 0.0),
    };
    let b = panel.bbox;
    let bbox = format!("{}x{}+{}+{}", b.width, b.height, b.x, b.y);
    format!(
        "{:<6} {:<22} {:>10.2} {:>10} {:>6} {:>10.2} {:>10.2} {:>10.2}  {}",
        panel.index,
        bbox,
        variance,
        edges,
        line_count,
        angle_std,
        panel.gradient.primary(),
        panel.frequency.primary(),
        if panel.flat { "yes" } else { "no" },
    )
}
