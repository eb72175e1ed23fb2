//! vegdensity CLI - vegetation density masks from multi-band GeoTIFF scenes

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use vegdensity_algorithms::imagery::ThresholdRange;
use vegdensity_algorithms::pipeline::{
    evaluate_geotiff_vegetation, PipelineReport, VegetationConfig, WriteOutcome, WritePolicy,
};
use vegdensity_algorithms::warp::ProjWarper;
use vegdensity_core::io::GeoTiffDriver;
use vegdensity_core::CRS;

#[derive(Parser)]
#[command(name = "vegdensity")]
#[command(author, version, about = "Vegetation density mask from a multi-band GeoTIFF", long_about = None)]
struct Cli {
    /// Input multi-band GeoTIFF
    input: PathBuf,

    /// Output mask GeoTIFF (replaced if it exists)
    output: PathBuf,

    /// Output coordinate reference system (e.g. EPSG:4326, +proj=... string)
    #[arg(long, default_value = "EPSG:4326")]
    crs: String,

    /// Lower NDVI bound classified as vegetation (inclusive)
    #[arg(long, default_value = "0.2", allow_negative_numbers = true)]
    range_min: f64,

    /// Upper NDVI bound classified as vegetation (inclusive)
    #[arg(long, default_value = "0.5", allow_negative_numbers = true)]
    range_max: f64,

    /// Red band index (1-based)
    #[arg(long, default_value = "6")]
    red_band: usize,

    /// Near-infrared band index (1-based)
    #[arg(long, default_value = "8")]
    nir_band: usize,

    /// Fail when the output can not be written
    #[arg(long)]
    strict_write: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn print_report(report: &PipelineReport) {
    let summary = &report.summary;
    let (rows, cols) = report.shape;

    println!("Mask: {} x {}", cols, rows);
    println!(
        "  Vegetation: {}  Background: {}  NoData: {}",
        summary.vegetation, summary.background, summary.nodata
    );
    if let Some(coverage) = summary.coverage() {
        println!("  Coverage: {:.2}%", coverage * 100.0);
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    println!("Started program.\n");
    println!("Reading arguments...");

    // Validated before anything touches the file system
    let range = ThresholdRange::new(cli.range_min, cli.range_max).with_context(|| {
        format!(
            "Unable to process range [{}, {}]",
            cli.range_min, cli.range_max
        )
    })?;
    let crs: CRS = cli
        .crs
        .parse()
        .with_context(|| format!("Invalid CRS '{}'", cli.crs))?;

    let config = VegetationConfig {
        crs,
        range,
        red_band: cli.red_band,
        nir_band: cli.nir_band,
        write_policy: if cli.strict_write {
            WritePolicy::Strict
        } else {
            WritePolicy::BestEffort
        },
        ..Default::default()
    };
    debug!("{:?}", config);

    println!(
        "Arguments: target_file '{}' out_file '{}' projection '{}' range '{}'\n",
        cli.input.display(),
        cli.output.display(),
        cli.crs,
        range
    );

    println!("Processing...");
    let start = Instant::now();
    let pb = spinner("Computing vegetation mask...");
    let result = evaluate_geotiff_vegetation(
        &cli.input,
        &cli.output,
        &config,
        &GeoTiffDriver::default(),
        &ProjWarper::default(),
    );
    pb.finish_and_clear();
    let report = result.with_context(|| format!("Failed to process {}", cli.input.display()))?;

    if let WriteOutcome::Failed(err) = &report.write {
        println!("Unable to write data to GeoTiff!");
        println!("{}", err);
    }
    print_report(&report);
    println!("  Processing time: {:.2?}", start.elapsed());

    println!("Complete!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vegdensity").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_pipeline_defaults() {
        let cli = parse(&["in.tif", "out.tif"]);
        assert_eq!(cli.crs, "EPSG:4326");
        assert_eq!((cli.range_min, cli.range_max), (0.2, 0.5));
        assert_eq!((cli.red_band, cli.nir_band), (6, 8));
        assert!(!cli.strict_write);
    }

    #[test]
    fn negative_range_bounds_parse() {
        let cli = parse(&["in.tif", "out.tif", "--range-min", "-0.9", "--range-max", "-0.1"]);
        assert_eq!((cli.range_min, cli.range_max), (-0.9, -0.1));
    }

    #[test]
    fn inverted_range_fails_before_reading_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.tif");
        let output = dir.path().join("mask.tif");
        let cli = parse(&[
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            "--range-min",
            "0.5",
            "--range-max",
            "0.2",
        ]);

        // The input does not exist, so any read would fail with a different message
        let err = run(cli).unwrap_err();
        assert_eq!(err.to_string(), "Unable to process range [0.5, 0.2]");
        assert!(!output.exists());
    }

    #[test]
    fn invalid_crs_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("mask.tif");
        let cli = parse(&[
            "missing.tif",
            output.to_str().unwrap(),
            "--crs",
            "not a crs",
        ]);

        let err = run(cli).unwrap_err();
        assert!(err.to_string().starts_with("Invalid CRS"));
        assert!(!output.exists());
    }
}
