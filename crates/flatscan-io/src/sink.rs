//! Diagnostic image sinks and the writer that fills a persistence record.
//!
//! A sink receives named rasters (`0-edges.jpg`, `photo-flatnessResult.jpg`,
//! ...) and returns where each one ended up. The extension picks the
//! encoding: `.png` is PNG, everything else is JPEG.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use flatscan_pipeline::render::flatten;
use flatscan_pipeline::{AnalysisKind, DynamicImage, Inspection};
use image::ImageEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;

use crate::record::{InspectionRecord, PanelRecord};

/// JPEG quality for every diagnostic image.
pub const JPEG_QUALITY: u8 = 95;

/// Errors from storing a single image.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Creating the directory or writing the file failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The image could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Destination for diagnostic images.
pub trait DiagnosticSink {
    /// Store `image` under `name`, returning its location.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the image cannot be encoded or stored.
    fn store(&mut self, name: &str, image: &DynamicImage) -> Result<String, SinkError>;
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn store(&mut self, name: &str, image: &DynamicImage) -> Result<String, SinkError> {
        (**self).store(name, image)
    }
}

/// Encode `image` for a file called `name`.
///
/// # Errors
///
/// Returns [`SinkError::Encode`] if the encoder rejects the image.
pub fn encode(name: &str, image: &DynamicImage) -> Result<Vec<u8>, SinkError> {
    let mut bytes = Vec::new();
    let png = Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    let (width, height) = (image.width(), image.height());

    match image {
        DynamicImage::ImageLuma8(gray) => {
            if png {
                PngEncoder::new(&mut bytes).write_image(
                    gray.as_raw(),
                    width,
                    height,
                    image::ExtendedColorType::L8,
                )?;
            } else {
                JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).write_image(
                    gray.as_raw(),
                    width,
                    height,
                    image::ExtendedColorType::L8,
                )?;
            }
        }
        other => {
            let rgb = other.to_rgb8();
            if png {
                PngEncoder::new(&mut bytes).write_image(
                    rgb.as_raw(),
                    width,
                    height,
                    image::ExtendedColorType::Rgb8,
                )?;
            } else {
                JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).write_image(
                    rgb.as_raw(),
                    width,
                    height,
                    image::ExtendedColorType::Rgb8,
                )?;
            }
        }
    }
    Ok(bytes)
}

/// Writes each image as a file in one directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Sink writing into `dir`. Nothing touches the filesystem until the
    /// first [`DiagnosticSink::store`].
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DiagnosticSink for DirectorySink {
    fn store(&mut self, name: &str, image: &DynamicImage) -> Result<String, SinkError> {
        let bytes = encode(name, image)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| SinkError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(name);
        std::fs::write(&path, bytes).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "wrote diagnostic image");
        Ok(path.display().to_string())
    }
}

/// Keeps encoded images in memory, keyed by name.
///
/// Useful for callers that upload the bytes themselves.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded bytes stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// Stored names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Number of stored images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// `true` when nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn store(&mut self, name: &str, image: &DynamicImage) -> Result<String, SinkError> {
        let bytes = encode(name, image)?;
        self.files.insert(name.to_string(), bytes);
        Ok(name.to_string())
    }
}

/// Which optional images [`write_inspection`] stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Prepended to each panel index to form the panel id.
    pub panel_prefix: String,
    /// Also store the segmented panel as `{panel_id}.png`.
    pub segments: bool,
    /// Also store the analyzed central crop as `{panel_id}-crop.jpg`.
    pub crops: bool,
}

/// Store every diagnostic image of `inspection` in `sink` and build the
/// persistence record.
///
/// Write failures never abort: each one is logged and added to the
/// warnings of the affected panel (or of the record, for the overlay),
/// leaving that path empty.
pub fn write_inspection<S: DiagnosticSink + ?Sized>(
    inspection: &Inspection,
    stem: &str,
    sink: &mut S,
    options: &WriteOptions,
) -> InspectionRecord {
    let mut panels = Vec::with_capacity(inspection.panels.len());
    for inspected in &inspection.panels {
        let panel_id = format!("{}{}", options.panel_prefix, inspected.panel.index);
        let mut record = PanelRecord::new(panel_id.clone(), inspected);

        for kind in AnalysisKind::ALL {
            let name = format!("{panel_id}-{}.jpg", kind.file_suffix());
            let visualization = &inspected.verdict.result(kind).visualization;
            if let Some(path) = store_or_warn(sink, &name, visualization, &mut record.warnings) {
                *record.image_path_mut(kind) = path;
            }
        }
        if options.segments {
            let image = DynamicImage::ImageRgb8(inspected.panel.image.clone());
            record.segment_image_path =
                store_or_warn(sink, &format!("{panel_id}.png"), &image, &mut record.warnings);
        }
        if options.crops {
            let image = DynamicImage::ImageRgb8(inspected.crop.clone());
            record.crop_image_path =
                store_or_warn(sink, &format!("{panel_id}-crop.jpg"), &image, &mut record.warnings);
        }
        panels.push(record);
    }

    let mut warnings = Vec::new();
    let overlay = DynamicImage::ImageRgb8(flatten(&inspection.overlay));
    let output_image_path = store_or_warn(
        sink,
        &format!("{stem}-flatnessResult.jpg"),
        &overlay,
        &mut warnings,
    )
    .unwrap_or_default();

    let mut record = InspectionRecord::new(inspection.verdict, output_image_path, panels);
    record.warnings = warnings;
    record
}

fn store_or_warn<S: DiagnosticSink + ?Sized>(
    sink: &mut S,
    name: &str,
    image: &DynamicImage,
    warnings: &mut Vec<String>,
) -> Option<String> {
    match sink.store(name, image) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!(name, error = %e, "diagnostic image not stored");
            warnings.push(format!("{name}: {e}"));
            None
        }
    }
}
