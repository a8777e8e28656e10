//! flatscan-pipeline: glass panel flatness inspection (sans-IO).
//!
//! Judges whether the glass panels in a façade photo are flat through:
//! boundary mask -> region segmentation -> per-panel analysis (edge
//! sharpness, line angles, gradient magnitude, frequency spectrum) ->
//! majority vote -> image verdict -> result overlay.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images or byte slices and returns structured results with in-memory
//! diagnostic rasters. Writing files and loading masks from disk lives in
//! `flatscan-io`.

pub mod aggregate;
pub mod analyze;
pub mod canny;
pub mod diagnostics;
pub mod edge;
pub mod frequency;
pub mod gradient;
pub mod grayscale;
pub mod hough;
pub mod line;
pub mod predictor;
pub mod render;
pub mod segment;
pub mod stats;
pub mod types;

#[cfg(test)]
mod fixtures;

use image::RgbaImage;

pub use diagnostics::{Clock, InspectionDiagnostics, MonotonicClock};
pub use predictor::{BoundaryPredictor, PrecomputedMask};
pub use types::{
    AnalysisKind, AnalysisMetrics, AnalysisResult, BoundingBox, DynamicImage, GrayImage,
    ImageVerdict, InspectionConfig, Panel, PanelVerdict, PipelineError, RgbImage,
};

use diagnostics::{InspectionSummary, PanelDiagnostics, StageDiagnostics, StageMetrics};

/// One segmented and analyzed panel.
#[derive(Debug, Clone)]
pub struct PanelInspection {
    /// The panel as cut out of the photo.
    pub panel: Panel,
    /// Central region the analyses ran on.
    pub crop: RgbImage,
    /// The four analysis results and the fused verdict.
    pub verdict: PanelVerdict,
}

/// Result of inspecting one photo.
#[derive(Debug, Clone)]
pub struct Inspection {
    /// Panels in contour-discovery order.
    pub panels: Vec<PanelInspection>,
    /// Image-level verdict.
    pub verdict: ImageVerdict,
    /// Photo with translucent per-panel result boxes (fully opaque).
    pub overlay: RgbaImage,
}

impl Inspection {
    /// Number of panels judged flat.
    #[must_use]
    pub fn flat_panel_count(&self) -> usize {
        self.panels.iter().filter(|p| p.verdict.flat).count()
    }
}

/// Inspect `photo` with an already-computed boundary `mask`.
///
/// # Errors
///
/// See [`inspect_with_predictor`].
pub fn inspect(
    photo: &RgbImage,
    mask: &GrayImage,
    config: &InspectionConfig,
) -> Result<Inspection, PipelineError> {
    inspect_with_predictor(photo, &PrecomputedMask::new(mask.clone()), config)
}

/// Inspect `photo`, asking `predictor` where the panels are.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` does not validate,
/// [`PipelineError::Predictor`] or [`PipelineError::MaskSize`] if no usable
/// mask is produced, and [`PipelineError::NoPanelsDetected`] if the mask
/// yields no panels.
pub fn inspect_with_predictor<P: BoundaryPredictor + ?Sized>(
    photo: &RgbImage,
    predictor: &P,
    config: &InspectionConfig,
) -> Result<Inspection, PipelineError> {
    run(photo, predictor, config, &MonotonicClock::new(), None).map(|(inspection, _)| inspection)
}

/// Like [`inspect_with_predictor`], also returning stage diagnostics
/// timed with `clock`.
///
/// # Errors
///
/// See [`inspect_with_predictor`].
pub fn inspect_with_diagnostics<P: BoundaryPredictor + ?Sized>(
    photo: &RgbImage,
    predictor: &P,
    config: &InspectionConfig,
    clock: &dyn Clock,
) -> Result<(Inspection, InspectionDiagnostics), PipelineError> {
    run(photo, predictor, config, clock, None)
}

/// Decode `photo_bytes` (PNG, JPEG, BMP, WebP) and inspect the photo.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] or [`PipelineError::ImageDecode`]
/// for unusable bytes, before any analysis runs. Otherwise see
/// [`inspect_with_predictor`].
pub fn inspect_bytes<P: BoundaryPredictor + ?Sized>(
    photo_bytes: &[u8],
    predictor: &P,
    config: &InspectionConfig,
    clock: &dyn Clock,
) -> Result<(RgbImage, Inspection, InspectionDiagnostics), PipelineError> {
    let start = clock.now();
    let photo = grayscale::decode_photo(photo_bytes)?;
    let decode = StageDiagnostics {
        duration: clock.now().saturating_sub(start),
        metrics: StageMetrics::Decode {
            input_bytes: photo_bytes.len(),
            width: photo.width(),
            height: photo.height(),
        },
    };
    let (inspection, mut diagnostics) = run(&photo, predictor, config, clock, Some(decode))?;
    diagnostics.total_duration = clock.now().saturating_sub(start);
    Ok((photo, inspection, diagnostics))
}

fn run<P: BoundaryPredictor + ?Sized>(
    photo: &RgbImage,
    predictor: &P,
    config: &InspectionConfig,
    clock: &dyn Clock,
    decode: Option<StageDiagnostics>,
) -> Result<(Inspection, InspectionDiagnostics), PipelineError> {
    config.validate()?;
    let start = clock.now();
    let (width, height) = photo.dimensions();

    // 1. Boundary mask, fitted to the photo.
    let t = clock.now();
    let raw_mask = predictor.predict(photo)?;
    let (mask_width, mask_height) = raw_mask.dimensions();
    let mask = crate::predictor::fit_mask(raw_mask, width, height)?;
    let predict = StageDiagnostics {
        duration: clock.now().saturating_sub(t),
        metrics: StageMetrics::Predict {
            mask_width,
            mask_height,
            resized: (mask_width, mask_height) != (width, height),
        },
    };

    // 2. Region segmentation.
    let t = clock.now();
    let panels = segment::segment_panels(photo, &mask, &config.segment)?;
    let segment = StageDiagnostics {
        duration: clock.now().saturating_sub(t),
        metrics: StageMetrics::Segment {
            panel_count: panels.len(),
            covered_area: panels.iter().map(|p| p.bbox.area()).sum(),
        },
    };
    if panels.is_empty() {
        tracing::info!("no panels detected");
        return Err(PipelineError::NoPanelsDetected);
    }

    // 3. Per-panel analysis.
    let mut inspected = Vec::with_capacity(panels.len());
    let mut panel_diagnostics = Vec::with_capacity(panels.len());
    for panel in panels {
        let _span = tracing::debug_span!("panel", index = panel.index).entered();
        let t = clock.now();
        let crop = analyze::crop_central(&panel.image, config.border_ratio);
        let verdict = analyze::analyze_crop(&crop, config);
        tracing::debug!(bbox = ?panel.bbox, flat = verdict.flat, "panel analyzed");
        panel_diagnostics.push(PanelDiagnostics {
            index: panel.index,
            bbox: panel.bbox,
            duration: clock.now().saturating_sub(t),
            edge: verdict.edge.metrics,
            line: verdict.line.metrics,
            gradient: verdict.gradient.metrics,
            frequency: verdict.frequency.metrics,
            flat: verdict.flat,
        });
        inspected.push(PanelInspection {
            panel,
            crop,
            verdict,
        });
    }

    // 4. Image verdict.
    let t = clock.now();
    let verdict = aggregate::aggregate(inspected.iter().map(|p| p.verdict.flat))?;
    let flat_panel_count = inspected.iter().filter(|p| p.verdict.flat).count();
    let aggregate = StageDiagnostics {
        duration: clock.now().saturating_sub(t),
        metrics: StageMetrics::Aggregate {
            panel_count: inspected.len(),
            flat_panel_count,
        },
    };

    // 5. Overlay.
    let t = clock.now();
    let boxes: Vec<(BoundingBox, bool)> = inspected
        .iter()
        .map(|p| (p.panel.bbox, p.verdict.flat))
        .collect();
    let overlay = render::render_overlay(photo, &boxes, &config.overlay);
    let render = StageDiagnostics {
        duration: clock.now().saturating_sub(t),
        metrics: StageMetrics::Render { width, height },
    };

    tracing::info!(
        panels = inspected.len(),
        flat_panels = flat_panel_count,
        result = verdict.label(),
        "inspection complete"
    );

    let diagnostics = InspectionDiagnostics {
        decode,
        predict,
        segment,
        aggregate,
        render,
        total_duration: clock.now().saturating_sub(start),
        summary: InspectionSummary {
            image_width: width,
            image_height: height,
            panel_count: inspected.len(),
            flat_panel_count,
            verdict,
        },
        panels: panel_diagnostics,
    };
    Ok((
        Inspection {
            panels: inspected,
            verdict,
            overlay,
        },
        diagnostics,
    ))
}
