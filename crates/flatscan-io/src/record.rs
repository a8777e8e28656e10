//! Persistence records.
//!
//! Field names and integer flags match the rows the downstream database
//! layer stores verbatim, so these structs serialize with `serde_json`
//! exactly as named here.

use flatscan_pipeline::{AnalysisKind, BoundingBox, ImageVerdict, PanelInspection};
use serde::{Deserialize, Serialize};

/// One panel's verdict, analysis texts and diagnostic image locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRecord {
    /// Identifier used in the diagnostic file names.
    pub panel_id: String,
    /// Panel rectangle in photo coordinates.
    pub bbox: BoundingBox,
    /// Majority-vote verdict: `1` = flat, `0` = not flat.
    pub flatness_result: u8,

    /// Sharpness verdict flag. Reported only, never part of the vote.
    pub edge_result: u8,
    /// Line-angle verdict flag.
    pub line_result: u8,
    /// Gradient-magnitude verdict flag.
    pub gradient_result: u8,
    /// Spectrum-range verdict flag.
    pub frequency_result: u8,

    /// Explanation of the sharpness verdict, with its metrics.
    pub edge_analysis: String,
    /// Explanation of the line-angle verdict, with its metrics.
    pub line_analysis: String,
    /// Explanation of the gradient verdict, with its metrics.
    pub gradient_analysis: String,
    /// Explanation of the spectrum verdict, with its metrics.
    pub frequency_analysis: String,

    /// Location of the Canny edge map.
    pub edge_image_path: String,
    /// Location of the crop with detected segments drawn on it.
    pub line_image_path: String,
    /// Location of the gradient-magnitude map.
    pub gradient_image_path: String,
    /// Location of the log-magnitude spectrum.
    pub frequency_image_path: String,

    /// Location of the segmented panel image, when written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_image_path: Option<String>,
    /// Location of the analyzed central crop, when written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_image_path: Option<String>,

    /// Non-fatal problems, e.g. a diagnostic image that could not be
    /// written. The matching `*_image_path` is empty in that case.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl PanelRecord {
    /// Build a record from an analyzed panel. Image paths start empty.
    #[must_use]
    pub fn new(panel_id: impl Into<String>, inspected: &PanelInspection) -> Self {
        let verdict = &inspected.verdict;
        let flag = |flat: bool| u8::from(flat);
        Self {
            panel_id: panel_id.into(),
            bbox: inspected.panel.bbox,
            flatness_result: flag(verdict.flat),
            edge_result: flag(verdict.edge.flat),
            line_result: flag(verdict.line.flat),
            gradient_result: flag(verdict.gradient.flat),
            frequency_result: flag(verdict.frequency.flat),
            edge_analysis: verdict.edge.explanation.clone(),
            line_analysis: verdict.line.explanation.clone(),
            gradient_analysis: verdict.gradient.explanation.clone(),
            frequency_analysis: verdict.frequency.explanation.clone(),
            edge_image_path: String::new(),
            line_image_path: String::new(),
            gradient_image_path: String::new(),
            frequency_image_path: String::new(),
            segment_image_path: None,
            crop_image_path: None,
            warnings: Vec::new(),
        }
    }

    /// Diagnostic image location for `kind`.
    #[must_use]
    pub fn image_path(&self, kind: AnalysisKind) -> &str {
        match kind {
            AnalysisKind::Edge => &self.edge_image_path,
            AnalysisKind::Line => &self.line_image_path,
            AnalysisKind::Gradient => &self.gradient_image_path,
            AnalysisKind::Frequency => &self.frequency_image_path,
        }
    }

    pub(crate) fn image_path_mut(&mut self, kind: AnalysisKind) -> &mut String {
        match kind {
            AnalysisKind::Edge => &mut self.edge_image_path,
            AnalysisKind::Line => &mut self.line_image_path,
            AnalysisKind::Gradient => &mut self.gradient_image_path,
            AnalysisKind::Frequency => &mut self.frequency_image_path,
        }
    }
}

/// Image-level outcome of one inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionRecord {
    /// `1` = flat, `0` = not flat.
    pub result: u8,
    /// "平整" or "不平整".
    pub result_label: String,
    /// Location of the composite overlay; empty if it could not be written.
    pub output_image_path: String,
    /// Per-panel records in segmentation order.
    pub panels: Vec<PanelRecord>,
    /// Non-fatal problems not tied to one panel, such as an overlay that
    /// could not be written.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl InspectionRecord {
    /// Record for `verdict` with no warnings yet.
    #[must_use]
    pub fn new(verdict: ImageVerdict, output_image_path: String, panels: Vec<PanelRecord>) -> Self {
        Self {
            result: verdict.as_flag(),
            result_label: verdict.label().to_string(),
            output_image_path,
            panels,
            warnings: Vec::new(),
        }
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error only if serialization itself fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use flatscan_pipeline::analyze::analyze_crop;
    use flatscan_pipeline::{InspectionConfig, Panel};
    use image::{Rgb, RgbImage};

    fn white_panel() -> PanelInspection {
        let image = RgbImage::from_pixel(60, 40, Rgb([255, 255, 255]));
        let verdict = analyze_crop(&image, &InspectionConfig::default());
        PanelInspection {
            panel: Panel {
                index: 0,
                bbox: BoundingBox::new(5, 6, 60, 40),
                image: image.clone(),
            },
            crop: image,
            verdict,
        }
    }

    #[test]
    fn flags_follow_the_verdicts() {
        let record = PanelRecord::new("0", &white_panel());
        assert_eq!(record.flatness_result, 1);
        // Plain white is too smooth to count as sharp.
        assert_eq!(record.edge_result, 0);
        assert_eq!(record.line_result, 1);
        assert_eq!(record.gradient_result, 1);
        assert_eq!(record.frequency_result, 1);
        assert!(record.edge_analysis.contains("Laplacian"));
        assert!(AnalysisKind::ALL.iter().all(|&k| record.image_path(k).is_empty()));
    }

    #[test]
    fn json_uses_persisted_field_names() {
        let mut record = PanelRecord::new("3", &white_panel());
        *record.image_path_mut(AnalysisKind::Line) = "out/3-lines.jpg".to_string();
        let inspection = InspectionRecord::new(ImageVerdict::NotFlat, "out/a.jpg".into(), vec![record]);
        let value: serde_json::Value = serde_json::from_str(&inspection.to_json().unwrap()).unwrap();

        assert_eq!(value["result"], 0);
        assert_eq!(value["result_label"], "不平整");
        let panel = &value["panels"][0];
        for key in [
            "flatness_result",
            "edge_result",
            "line_result",
            "gradient_result",
            "frequency_result",
            "edge_analysis",
            "line_analysis",
            "gradient_analysis",
            "frequency_analysis",
            "edge_image_path",
            "line_image_path",
            "gradient_image_path",
            "frequency_image_path",
        ] {
            assert!(panel.get(key).is_some(), "missing {key}");
        }
        assert_eq!(panel["line_image_path"], "out/3-lines.jpg");
        assert_eq!(panel["bbox"]["x"], 5);
        assert!(panel.get("crop_image_path").is_none());

        let back: InspectionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, inspection);
    }
}
