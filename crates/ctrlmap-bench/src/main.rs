//! ctrlmap-bench: CLI tool for edge detector experimentation and diagnostics.
//!
//! Runs a preset (or a custom detector spec) on a given image file,
//! printing timing and edge statistics. Useful for:
//!
//! - Comparing presets (`fast` vs `ultra`) on real renders
//! - Tuning detector parameters through `--spec-json`
//! - Checking which numeric backends this build can use
//! - Writing the RGB control map for visual inspection
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin ctrlmap-bench -- [OPTIONS] <IMAGE_PATH>
//! cargo run --release --bin ctrlmap-bench -- --self-check
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use ctrlmap_edges::{
    Capabilities, Clock, DetectionDiagnostics, DetectorSpec, EdgeMap, Image, Preset, Registry,
};
use image::DynamicImage;

/// Edge detector experimentation and diagnostics for ctrlmap.
///
/// Runs an edge-detection preset on a given image and prints timing and
/// edge statistics for each run.
#[derive(Parser)]
#[command(name = "ctrlmap-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    #[arg(required_unless_present = "self_check")]
    image_path: Option<PathBuf>,

    /// Quality preset.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_PRESET)]
    preset: PresetArg,

    /// Full detector spec as a JSON string.
    ///
    /// When provided, `--preset` is ignored. Example:
    /// `{"kind": "canny", "sigma": 1.4, "low_threshold": 0.05}`.
    #[arg(long)]
    spec_json: Option<String>,

    /// Treat every numeric backend as unavailable, forcing fallback to
    /// the builtin baseline detector.
    #[arg(long)]
    builtin_only: bool,

    /// Write the RGB control map (PNG) to this path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Print backend availability for every detector kind and exit.
    #[arg(long)]
    self_check: bool,
}

/// Preset selection.
#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    /// Backend-free contrast threshold.
    Fast,
    /// Canny blended with Sobel gradients.
    Balanced,
    /// Canny blended with two-scale Sobel gradients.
    High,
    /// Three-scale Canny blended with Canny.
    Ultra,
}

/// Maps a [`Preset`] to the local CLI [`PresetArg`] enum.
const fn preset_arg(preset: Preset) -> PresetArg {
    match preset {
        Preset::Fast => PresetArg::Fast,
        Preset::Balanced => PresetArg::Balanced,
        Preset::High => PresetArg::High,
        Preset::Ultra => PresetArg::Ultra,
    }
}

/// The CLI default preset, derived from the library's default so the
/// two cannot silently diverge.
const CLI_DEFAULT_PRESET: PresetArg = preset_arg(Preset::DEFAULT);

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Fast => Self::Fast,
            PresetArg::Balanced => Self::Balanced,
            PresetArg::High => Self::High,
            PresetArg::Ultra => Self::Ultra,
        }
    }
}

/// Build the detector spec from CLI arguments.
///
/// `--spec-json` takes precedence over `--preset`.
fn spec_from_cli(cli: &Cli) -> Result<DetectorSpec, String> {
    if let Some(ref json) = cli.spec_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --spec-json: {e}"));
    }
    Ok(Preset::from(cli.preset).spec())
}

/// Decode an image file into a gray or RGB [`Image`].
///
/// Layouts other than 8-bit gray and 8-bit RGB (alpha, 16-bit) are
/// converted to 8-bit RGB.
fn load_image(path: &Path) -> Result<Image, String> {
    let decoded = image::open(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let image = match decoded {
        DynamicImage::ImageLuma8(gray) => Image::Gray(gray),
        DynamicImage::ImageRgb8(rgb) => Image::Rgb(rgb),
        other => Image::Rgb(other.to_rgb8()),
    };
    Ok(image)
}

fn print_self_check(capabilities: Capabilities) {
    println!("{:<12} {:<10} Status", "Detector", "Backend");
    println!("{}", "-".repeat(32));
    for status in capabilities.status() {
        println!("{status}");
    }
}

fn write_control_map(path: &Path, edges: &EdgeMap) -> Result<(), String> {
    edges
        .to_rgb_image()
        .save(path)
        .map_err(|e| format!("Error writing control map to {}: {e}", path.display()))?;
    eprintln!("Control map written to {}", path.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let capabilities = if cli.builtin_only {
        Capabilities::builtin_only()
    } else {
        ctrlmap_edges::capabilities()
    };

    if cli.self_check {
        print_self_check(capabilities);
        return ExitCode::SUCCESS;
    }

    let Some(ref image_path) = cli.image_path else {
        eprintln!("An image path is required");
        return ExitCode::FAILURE;
    };

    let spec = match spec_from_cli(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let resolved = match Registry::with_capabilities(capabilities).resolve_spec(&spec) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Invalid detector spec: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "resolved {} detector ({} fallback step(s))",
        resolved.detector.kind(),
        resolved.substitutions.len()
    );

    let image = match load_image(image_path) {
        Ok(img) => img,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({}x{}, {} channel(s))",
        image_path.display(),
        image.width(),
        image.height(),
        image.channels(),
    );
    eprintln!("Spec: {spec:#?}");
    for substitution in &resolved.substitutions {
        eprintln!("Fallback: {substitution}");
    }
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match ctrlmap_edges::detect_with_diagnostics(
            resolved.detector.as_ref(),
            &image,
            &StdClock,
        ) {
            Ok((edges, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write the control map on the first run only.
                if run == 0
                    && let Some(ref output) = cli.output
                    && let Err(msg) = write_control_map(output, &edges)
                {
                    eprintln!("{msg}");
                    return ExitCode::FAILURE;
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Detection error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[DetectionDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Detection is deterministic, so every run should agree.
    let first = all_diagnostics[0].edge_pixel_count;
    if all_diagnostics.iter().all(|d| d.edge_pixel_count == first) {
        println!("Edge pixels: {first} (identical across runs)");
    } else {
        println!("Warning: edge pixel counts differ between runs");
    }
}
