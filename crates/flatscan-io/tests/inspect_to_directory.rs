//! Integration test: inspect synthetic façade photos with a stub predictor
//! and write every diagnostic image into a temporary directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use flatscan_io::{DiagnosticSink, DirectorySink, MemorySink, SinkError, WriteOptions};
use flatscan_pipeline::{
    AnalysisKind, BoundaryPredictor, DynamicImage, GrayImage, ImageVerdict, InspectionConfig,
    PipelineError, RgbImage,
};
use image::{Luma, Rgb};

/// Predicts the same rectangles for every photo.
struct Rects(Vec<(u32, u32, u32, u32)>);

impl BoundaryPredictor for Rects {
    fn predict(&self, photo: &RgbImage) -> Result<GrayImage, PipelineError> {
        Ok(GrayImage::from_fn(photo.width(), photo.height(), |x, y| {
            let inside = self
                .0
                .iter()
                .any(|&(rx, ry, rw, rh)| x >= rx && x < rx + rw && y >= ry && y < ry + rh);
            Luma([if inside { 255 } else { 0 }])
        }))
    }
}

/// Rejects every write.
struct FullDisk;

impl DiagnosticSink for FullDisk {
    fn store(&mut self, name: &str, _image: &DynamicImage) -> Result<String, SinkError> {
        Err(SinkError::Io {
            path: name.into(),
            source: std::io::Error::other("no space left on device"),
        })
    }
}

/// Light gray façade with two panels side by side.
fn facade() -> RgbImage {
    RgbImage::from_pixel(400, 200, Rgb([230, 230, 230]))
}

fn two_panels() -> Rects {
    Rects(vec![(20, 20, 150, 150), (220, 20, 150, 150)])
}

#[test]
fn writes_diagnostics_and_record() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("output");
    let inspection =
        flatscan_pipeline::inspect_with_predictor(&facade(), &two_panels(), &InspectionConfig::default())
            .unwrap();
    assert_eq!(inspection.verdict, ImageVerdict::Flat);

    let mut sink = DirectorySink::new(&out);
    let options = WriteOptions {
        segments: true,
        crops: true,
        ..WriteOptions::default()
    };
    let record = flatscan_io::write_inspection(&inspection, "facade", &mut sink, &options);

    assert_eq!(record.result, 1);
    assert_eq!(record.result_label, "平整");
    assert!(record.warnings.is_empty());
    assert_eq!(record.panels.len(), 2);
    assert!(out.join("facade-flatnessResult.jpg").is_file());
    assert_eq!(
        std::path::PathBuf::from(&record.output_image_path),
        out.join("facade-flatnessResult.jpg")
    );

    for (i, panel) in record.panels.iter().enumerate() {
        assert_eq!(panel.panel_id, i.to_string());
        assert_eq!(panel.flatness_result, 1);
        assert!(panel.warnings.is_empty());
        for kind in AnalysisKind::ALL {
            let expected = out.join(format!("{i}-{}.jpg", kind.file_suffix()));
            assert!(expected.is_file(), "{expected:?}");
            assert_eq!(std::path::PathBuf::from(panel.image_path(kind)), expected);
        }
        assert!(out.join(format!("{i}.png")).is_file());
        assert!(out.join(format!("{i}-crop.jpg")).is_file());
    }

    // The overlay keeps the photo's size.
    let overlay = image::open(out.join("facade-flatnessResult.jpg")).unwrap();
    assert_eq!((overlay.width(), overlay.height()), (400, 200));

    let json = record.to_json().unwrap();
    let back: flatscan_io::InspectionRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn write_failures_do_not_block_the_verdict() {
    let inspection =
        flatscan_pipeline::inspect_with_predictor(&facade(), &two_panels(), &InspectionConfig::default())
            .unwrap();
    let record =
        flatscan_io::write_inspection(&inspection, "facade", &mut FullDisk, &WriteOptions::default());

    assert_eq!(record.result, 1);
    assert!(record.output_image_path.is_empty());
    assert_eq!(record.warnings.len(), 1);
    for panel in &record.panels {
        assert_eq!(panel.warnings.len(), 4);
        assert!(panel.warnings[0].contains("no space left"));
        assert!(AnalysisKind::ALL.iter().all(|&k| panel.image_path(k).is_empty()));
        assert!(!panel.edge_analysis.is_empty());
    }
}

#[test]
fn panel_prefix_names_files() {
    let inspection =
        flatscan_pipeline::inspect_with_predictor(&facade(), &two_panels(), &InspectionConfig::default())
            .unwrap();
    let mut sink = MemorySink::new();
    let options = WriteOptions {
        panel_prefix: "facade-".to_string(),
        ..WriteOptions::default()
    };
    let record = flatscan_io::write_inspection(&inspection, "facade", &mut sink, &options);
    assert_eq!(record.panels[1].panel_id, "facade-1");
    assert!(sink.get("facade-1-frequency.jpg").is_some());
    assert!(sink.get("facade-flatnessResult.jpg").is_some());
    // 2 panels x 4 analyses + overlay.
    assert_eq!(sink.len(), 9);
}

#[test]
fn empty_mask_is_an_error() {
    let result = flatscan_pipeline::inspect_with_predictor(
        &facade(),
        &Rects(Vec::new()),
        &InspectionConfig::default(),
    );
    assert!(matches!(result, Err(PipelineError::NoPanelsDetected)));
}
