use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;

use fringefit::config::FringeConfig;
use fringefit::dataset::write_dataset;
use fringefit::simulation::{NoiseConfig, ScanConfig, SyntheticExperiment, generate_experiment};

#[derive(Parser, Debug)]
#[command(name = "generate_dataset")]
#[command(about = "Generate a synthetic fringe dataset CSV for the configured channels")]
struct Args {
    /// Output CSV path
    #[arg(short, long, default_value = "data/synthetic.csv")]
    output: PathBuf,

    /// TOML configuration providing the experiment channels
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Intensity noise standard deviation relative to the peak
    #[arg(short, long, default_value_t = 0.01)]
    noise: f64,

    /// Samples per raw scan
    #[arg(long, default_value_t = 2001)]
    samples: usize,

    /// Scan half range in meters
    #[arg(long, default_value_t = 0.05)]
    range: f64,

    /// Envelope wavenumber at Δm = 0 in rad/m
    #[arg(long, default_value_t = 100.0)]
    km: f64,

    /// Carrier wavenumber at Δm = 0 in rad/m
    #[arg(long, default_value_t = 1000.0)]
    kc: f64,

    /// Envelope wavenumber change per unit Δm
    #[arg(long, default_value_t = 0.0)]
    km_per_step: f64,

    /// Carrier wavenumber change per unit Δm
    #[arg(long, default_value_t = 0.0)]
    kc_per_step: f64,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match &args.config {
        Some(path) => FringeConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FringeConfig::default(),
    };

    let mut model = SyntheticExperiment {
        km_per_step: args.km_per_step,
        kc_per_step: args.kc_per_step,
        ..SyntheticExperiment::default()
    };
    model.base.km = args.km;
    model.base.kc = args.kc;
    model.base.d = 2.0 * args.km;

    let scan = ScanConfig {
        x_start: -args.range,
        x_end: args.range,
        num_samples: args.samples,
        ..ScanConfig::default()
    };
    let mut noise = NoiseConfig::default().with_intensity_std(args.noise);
    noise.seed = args.seed;

    let scans = generate_experiment(&config.experiment, &model, &scan, &noise)
        .context("Failed to generate scans")?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    write_dataset(file, &scans).context("Failed to write dataset")?;

    eprintln!(
        "Wrote {} channels ({} samples each) to {}",
        scans.len(),
        args.samples,
        args.output.display()
    );
    Ok(())
}
