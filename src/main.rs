use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use fringefit::config::{FringeConfig, WavenumberRange};
use fringefit::dataset::Dataset;
use fringefit::output::{AnalysisReport, OutputFormat, create_formatter};
use fringefit::processing::{analyze_trends, process_dataset};

#[derive(Parser, Debug)]
#[command(name = "fringefit")]
#[command(about = "Extract envelope and carrier wavenumbers from fringe scans and regress them against Δm", long_about = None)]
struct Args {
    /// Dataset CSV with x<label>/I<label> column pairs
    data: PathBuf,

    /// TOML configuration overriding the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Number of resampled points per channel
    #[arg(long)]
    points: Option<usize>,

    /// Half width of the kept window around the peak, in meters
    #[arg(long)]
    half_width: Option<f64>,

    /// Envelope search range in rad/m (e.g., "0-500")
    #[arg(long)]
    envelope_range: Option<WavenumberRange>,

    /// Carrier search range in rad/m (e.g., "900-1100")
    #[arg(long)]
    carrier_range: Option<WavenumberRange>,

    /// Band-pass width as a fraction of each center wavenumber
    #[arg(long)]
    width_factor: Option<f64>,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &args.config {
        Some(path) => FringeConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FringeConfig::default(),
    };
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    let dataset = Dataset::from_path(&args.data)
        .with_context(|| format!("Failed to read dataset {}", args.data.display()))?;

    let specs = config.experiment.channel_specs();
    log::info!(
        "Processing {} channels from {}",
        specs.len(),
        args.data.display()
    );

    let outcomes = process_dataset(&dataset, &specs, &config.pipeline);
    let trends = analyze_trends(
        &outcomes,
        &config.experiment.regimes(),
        &config.pipeline.regression,
    )?;

    let report = AnalysisReport::new(&args.data.display().to_string(), &outcomes, trends);
    let formatter = create_formatter(args.format, args.verbose > 0);
    print!("{}", formatter.format(&report)?);

    Ok(())
}

fn apply_overrides(config: &mut FringeConfig, args: &Args) {
    let pipeline = &mut config.pipeline;
    if let Some(points) = args.points {
        pipeline.preprocess.num_points = points;
    }
    if let Some(half_width) = args.half_width {
        pipeline.preprocess.half_width = half_width;
    }
    if let Some(range) = args.envelope_range {
        pipeline.spectral.envelope_range = range;
    }
    if let Some(range) = args.carrier_range {
        pipeline.spectral.carrier_range = range;
    }
    if let Some(factor) = args.width_factor {
        pipeline.filter.width_factor = factor;
    }
}
