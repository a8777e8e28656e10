//! flatscan: judge whether the glass panels in a façade photo are flat.
//!
//! Reads a photo and a boundary mask (white = glass panel), runs the
//! inspection, writes per-panel diagnostic images and the result overlay
//! into an output directory, and prints either a human-readable report or
//! the persistence record as JSON.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin flatscan -- --mask <MASK_PATH> [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use flatscan_io::{DirectorySink, MaskFilePredictor, WriteOptions};
use flatscan_pipeline::frequency::LogBase;
use flatscan_pipeline::{InspectionConfig, MonotonicClock};
use tracing_subscriber::EnvFilter;

/// Flatness inspection of glass façade panels.
///
/// Thresholds start from the built-in reference values, or from
/// `--config` / `--config-json` when given; individual flags override
/// either.
#[derive(Parser)]
#[command(name = "flatscan", version)]
struct Cli {
    /// Path to the façade photo (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Boundary mask for the photo: white where glass panels are.
    #[arg(long)]
    mask: PathBuf,

    /// Directory for diagnostic images and the result overlay.
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,

    /// Prefix for panel ids in diagnostic file names.
    #[arg(long, default_value = "")]
    panel_prefix: String,

    /// Also write each segmented panel as `{panel_id}.png`.
    #[arg(long)]
    segments: bool,

    /// Also write each analyzed central crop as `{panel_id}-crop.jpg`.
    #[arg(long)]
    crops: bool,

    /// Inspection config as a JSON file.
    #[arg(long, conflicts_with = "config_json")]
    config: Option<PathBuf>,

    /// Inspection config as a JSON string.
    ///
    /// Missing fields keep their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Mask values at or above this count as panel.
    #[arg(long)]
    mask_threshold: Option<u8>,

    /// Fraction of each panel side discarded before analysis.
    #[arg(long)]
    border_ratio: Option<f64>,

    /// Maximum line-angle standard deviation (degrees) for a flat vote.
    #[arg(long)]
    max_angle_std: Option<f64>,

    /// Maximum gradient-magnitude standard deviation for a flat vote.
    #[arg(long)]
    max_gradient_std: Option<f64>,

    /// Maximum spectrum range for a flat vote.
    #[arg(long)]
    frequency_threshold: Option<f64>,

    /// Logarithm of the magnitude spectrum.
    #[arg(long, value_enum)]
    log_base: Option<Base>,

    /// Print the persistence record as JSON instead of a report.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (`-v` debug, `-vv` trace). `RUST_LOG`
    /// takes precedence when set.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Spectrum logarithm selection.
#[derive(Clone, Copy, ValueEnum)]
enum Base {
    /// `20 * log10` (decibels).
    Ten,
    /// `20 * ln`.
    Natural,
}

/// Build the [`InspectionConfig`] from a config file or string, then
/// apply individual flag overrides.
fn config_from_cli(cli: &Cli) -> Result<InspectionConfig, String> {
    let mut config = if let Some(ref path) = cli.config {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading --config {}: {e}", path.display()))?;
        serde_json::from_str(&text).map_err(|e| format!("Error parsing --config: {e}"))?
    } else if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        InspectionConfig::default()
    };

    if let Some(v) = cli.mask_threshold {
        config.segment.mask_threshold = v;
    }
    if let Some(v) = cli.border_ratio {
        config.border_ratio = v;
    }
    if let Some(v) = cli.max_angle_std {
        config.line.max_angle_std = v;
    }
    if let Some(v) = cli.max_gradient_std {
        config.gradient.max_std = v;
    }
    if let Some(v) = cli.frequency_threshold {
        config.frequency.threshold = v;
    }
    if let Some(base) = cli.log_base {
        config.frequency.log_base = match base {
            Base::Ten => LogBase::Ten,
            Base::Natural => LogBase::Natural,
        };
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

/// File stem used to name the result overlay.
fn output_stem(image_path: &Path) -> &str {
    image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        image = %cli.image_path.display(),
        bytes = image_bytes.len(),
        "loaded photo"
    );

    let predictor = match MaskFilePredictor::open(&cli.mask) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let (_, inspection, diagnostics) = match flatscan_pipeline::inspect_bytes(
        &image_bytes,
        &predictor,
        &config,
        &MonotonicClock::new(),
    ) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Inspection error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut sink = DirectorySink::new(&cli.out_dir);
    let options = WriteOptions {
        panel_prefix: cli.panel_prefix.clone(),
        segments: cli.segments,
        crops: cli.crops,
    };
    let record = flatscan_io::write_inspection(
        &inspection,
        output_stem(&cli.image_path),
        &mut sink,
        &options,
    );

    if cli.json {
        match record.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing record: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", diagnostics.report());
        for panel in &record.panels {
            println!(
                "panel {}: {} | line: {} | gradient: {} | frequency: {}",
                panel.panel_id,
                if panel.flatness_result == 1 { "flat" } else { "not flat" },
                panel.line_analysis,
                panel.gradient_analysis,
                panel.frequency_analysis,
            );
        }
        println!();
        println!("Result: {} ({})", record.result_label, record.result);
        if !record.output_image_path.is_empty() {
            println!("Overlay: {}", record.output_image_path);
        }
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("flatscan").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_without_flags() {
        let cli = parse(&["--mask", "m.png", "photo.jpg"]);
        assert_eq!(config_from_cli(&cli).unwrap(), InspectionConfig::default());
        assert_eq!(cli.out_dir, PathBuf::from("output"));
    }

    #[test]
    fn flags_override_json() {
        let cli = parse(&[
            "--mask",
            "m.png",
            "--config-json",
            r#"{"gradient": {"max_std": 80.0}, "border_ratio": 0.2}"#,
            "--border-ratio",
            "0.05",
            "--log-base",
            "natural",
            "photo.jpg",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.gradient.max_std - 80.0).abs() < f64::EPSILON);
        assert!((config.border_ratio - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.frequency.log_base, LogBase::Natural);
        assert_eq!(config.segment, InspectionConfig::default().segment);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cli = parse(&["--mask", "m.png", "--border-ratio", "0.6", "photo.jpg"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("border_ratio"));

        let cli = parse(&["--mask", "m.png", "--config-json", "{not json", "photo.jpg"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("--config-json"));
    }

    #[test]
    fn mask_is_required() {
        assert!(Cli::try_parse_from(["flatscan", "photo.jpg"]).is_err());
    }

    #[test]
    fn stem_names_overlay() {
        assert_eq!(output_stem(Path::new("shots/tower-3.jpeg")), "tower-3");
        assert_eq!(output_stem(Path::new("")), "image");
    }
}
