//! Log-magnitude spectrum spread of a panel crop.
//!
//! The crop's 2D DFT is computed as row transforms followed by column
//! transforms, shifted so the zero frequency sits at the center, and
//! reduced to `20 * log(|F| + epsilon)`. A wide spread between the
//! strongest and weakest frequency indicates strong periodic structure.

use image::{DynamicImage, GrayImage, Luma};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::stats::min_max;
use crate::types::{AnalysisKind, AnalysisMetrics, AnalysisResult};

/// Logarithm used for the magnitude spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogBase {
    /// `20 * log10`, the decibel scale.
    #[default]
    Ten,
    /// `20 * ln`, for thresholds calibrated on natural-log spectra.
    Natural,
}

impl LogBase {
    fn apply(self, value: f64) -> f64 {
        match self {
            Self::Ten => value.log10(),
            Self::Natural => value.ln(),
        }
    }
}

/// Settings for the frequency analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyConfig {
    /// Spectrum range at or above which the panel is not flat.
    pub threshold: f64,
    /// Added to every magnitude before the logarithm.
    pub epsilon: f64,
    /// Logarithm of the spectrum.
    pub log_base: LogBase,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            threshold: 400.0,
            epsilon: 1.0,
            log_base: LogBase::Ten,
        }
    }
}

/// Centered log-magnitude spectrum of `gray`, row-major.
#[must_use]
pub fn magnitude_spectrum(gray: &GrayImage, config: &FrequencyConfig) -> Vec<f64> {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let mut data: Vec<Complex<f64>> = gray
        .pixels()
        .map(|p| Complex::new(f64::from(p.0[0]), 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    let row_fft = planner.plan_fft_forward(w);
    for row in data.chunks_exact_mut(w) {
        row_fft.process(row);
    }

    let column_fft = planner.plan_fft_forward(h);
    let mut column = vec![Complex::new(0.0, 0.0); h];
    for x in 0..w {
        for (y, c) in column.iter_mut().enumerate() {
            *c = data[y * w + x];
        }
        column_fft.process(&mut column);
        for (y, c) in column.iter().enumerate() {
            data[y * w + x] = *c;
        }
    }

    // Zero frequency moves from (0, 0) to (w / 2, h / 2).
    let mut spectrum = vec![0.0; w * h];
    for y in 0..h {
        for x in 0..w {
            let value = 20.0 * config.log_base.apply(data[y * w + x].norm() + config.epsilon);
            spectrum[((y + h / 2) % h) * w + (x + w / 2) % w] = value;
        }
    }
    spectrum
}

/// Classify `gray` by the range of its log-magnitude spectrum.
///
/// The visualization is the spectrum min-max normalized to `0..=255`.
#[must_use]
pub fn analyze_frequency(gray: &GrayImage, config: &FrequencyConfig) -> AnalysisResult {
    let spectrum = magnitude_spectrum(gray, config);
    let (min, max) = min_max(&spectrum);
    let range = max - min;
    let flat = range < config.threshold;

    let explanation = if flat {
        format!("surface is flat (small spectrum max-min difference: {range:.2})")
    } else {
        format!("surface may be uneven (large spectrum max-min difference: {range:.2})")
    };
    tracing::debug!(max, min, range, flat, "frequency analysis");

    AnalysisResult {
        kind: AnalysisKind::Frequency,
        flat,
        metrics: AnalysisMetrics::Frequency { max, min, range },
        explanation,
        visualization: DynamicImage::ImageLuma8(normalize(
            &spectrum,
            gray.width(),
            gray.height(),
            min,
            range,
        )),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn normalize(values: &[f64], width: u32, height: u32, min: f64, range: f64) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if range <= 0.0 {
            return Luma([0]);
        }
        let v = values[y as usize * width as usize + x as usize];
        Luma([((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8])
    })
}
