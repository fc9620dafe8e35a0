use rayon::prelude::*;
use rolling_stats::Stats;
use serde::Serialize;

use crate::config::{PipelineConfig, RegressionConfig};
use crate::constants::MIN_INTENSITY_SPAN;
use crate::dataset::Dataset;
use crate::error::{FringeError, Result};
use crate::fitting::{FitResult, RegressionResult, fit_fringe, linear_estimation};
use crate::preprocess::preprocess;
use crate::series::MeasurementSeries;
use crate::signal_processing::bandpass::{FilteredSignal, reconstruct};
use crate::signal_processing::math::mean;
use crate::signal_processing::spectrum::{
    FrequencySpectrum, WavenumberEstimate, compute_spectrum, estimate_wavenumbers,
};

/// A measurement channel and where it sits on the step axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSpec {
    pub id: String,
    /// Step parameter Δm
    pub step: f64,
    pub step_uncertainty: f64,
}

/// Channels regressed together
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Regime {
    pub name: String,
    pub channel_ids: Vec<String>,
}

/// Channel ready for the pipeline
#[derive(Debug, Clone)]
pub struct ChannelInput {
    pub spec: ChannelSpec,
    pub series: MeasurementSeries,
}

/// Summary of the fit residuals `observed - model`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResidualSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub rms: f64,
}

impl ResidualSummary {
    fn from_residuals(residuals: &[f64]) -> Self {
        let mut stats: Stats<f64> = Stats::new();
        for &r in residuals {
            stats.update(r);
        }
        let rms = if residuals.is_empty() {
            0.0
        } else {
            (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt()
        };
        Self {
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
            rms,
        }
    }
}

/// Everything the pipeline produced for one channel
#[derive(Debug, Clone, Serialize)]
pub struct ChannelAnalysis {
    pub spectrum: FrequencySpectrum,
    pub estimate: WavenumberEstimate,
    pub filtered: FilteredSignal,
    pub fit: FitResult,
    pub residuals: ResidualSummary,
}

#[derive(Debug)]
pub struct ChannelOutcome {
    pub channel: ChannelSpec,
    pub result: Result<ChannelAnalysis>,
}

/// Run spectrum → estimate → band-pass → fit on one preprocessed series
///
/// # Errors
/// Returns `FringeError::DegenerateInput` for a constant intensity profile,
/// otherwise whatever the failing stage reports.
pub fn process_channel(
    series: &MeasurementSeries,
    config: &PipelineConfig,
) -> Result<ChannelAnalysis> {
    let intensity = series.intensity();
    let (lo, hi) = intensity
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if hi - lo < MIN_INTENSITY_SPAN {
        return Err(FringeError::DegenerateInput(format!(
            "intensity is constant ({} to {})",
            lo, hi
        )));
    }

    let baseline = mean(intensity);
    let centered: Vec<f64> = intensity.iter().map(|v| v - baseline).collect();

    let spectrum = compute_spectrum(&centered, series.spacing())?;
    let estimate = estimate_wavenumbers(&spectrum, &config.spectral)?;
    let filtered = reconstruct(series.x(), baseline, &spectrum, &estimate, &config.filter)?;
    let fit = fit_fringe(&filtered, &estimate, &config.fit)?;
    let residuals =
        ResidualSummary::from_residuals(&fit.residuals(filtered.x(), filtered.intensity()));

    Ok(ChannelAnalysis {
        spectrum,
        estimate,
        filtered,
        fit,
        residuals,
    })
}

/// Process every channel in parallel, preserving input order
///
/// A failing channel is logged and reported in its outcome; the others run
/// to completion.
pub fn process_channels(channels: &[ChannelInput], config: &PipelineConfig) -> Vec<ChannelOutcome> {
    channels
        .par_iter()
        .map(|input| {
            let result = process_channel(&input.series, config);
            log_outcome(&input.spec, &result);
            ChannelOutcome {
                channel: input.spec.clone(),
                result,
            }
        })
        .collect()
}

/// Load, preprocess and process each channel of `specs` from a raw dataset
///
/// A missing column or a scan that cannot be preprocessed becomes a failed
/// outcome for that channel only. Outcomes follow the order of `specs`.
pub fn process_dataset(
    dataset: &Dataset,
    specs: &[ChannelSpec],
    config: &PipelineConfig,
) -> Vec<ChannelOutcome> {
    specs
        .par_iter()
        .map(|spec| {
            let result = dataset
                .scan(&spec.id)
                .and_then(|scan| preprocess(&scan.x, &scan.intensity, &config.preprocess))
                .and_then(|series| process_channel(&series, config));
            log_outcome(spec, &result);
            ChannelOutcome {
                channel: spec.clone(),
                result,
            }
        })
        .collect()
}

fn log_outcome(spec: &ChannelSpec, result: &Result<ChannelAnalysis>) {
    match result {
        Ok(analysis) => log::info!(
            "Channel {}: km = {:.2} ± {:.2} rad/m, kc = {:.2} ± {:.2} rad/m",
            spec.id,
            analysis.fit.envelope_wavenumber(),
            analysis.fit.envelope_wavenumber_err(),
            analysis.fit.carrier_wavenumber(),
            analysis.fit.carrier_wavenumber_err()
        ),
        Err(e) => log::warn!("Channel {} failed: {}", spec.id, e),
    }
}

/// Regression of both wavenumbers against the step parameter for one regime
#[derive(Debug, Clone, Serialize)]
pub struct RegimeTrend {
    pub name: String,
    pub channel_ids: Vec<String>,
    pub steps: Vec<f64>,
    pub step_uncertainties: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub km: Option<RegressionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kc: Option<RegressionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub regimes: Vec<RegimeTrend>,
}

struct TrendPoints {
    steps: Vec<f64>,
    step_errs: Vec<f64>,
    km: Vec<f64>,
    km_errs: Vec<f64>,
    kc: Vec<f64>,
    kc_errs: Vec<f64>,
}

fn collect_points(outcomes: &[&ChannelOutcome]) -> Result<TrendPoints> {
    let mut points = TrendPoints {
        steps: Vec::new(),
        step_errs: Vec::new(),
        km: Vec::new(),
        km_errs: Vec::new(),
        kc: Vec::new(),
        kc_errs: Vec::new(),
    };
    for outcome in outcomes {
        let analysis = outcome.result.as_ref().map_err(|e| {
            FringeError::Config(format!("channel {} has no fit: {}", outcome.channel.id, e))
        })?;
        points.steps.push(outcome.channel.step);
        points.step_errs.push(outcome.channel.step_uncertainty);
        points.km.push(analysis.fit.envelope_wavenumber());
        points.km_errs.push(analysis.fit.envelope_wavenumber_err().abs());
        points.kc.push(analysis.fit.carrier_wavenumber());
        points.kc_errs.push(analysis.fit.carrier_wavenumber_err().abs());
    }
    if points.steps.len() < 2 {
        return Err(FringeError::Config(format!(
            "{} channel(s) cannot define a trend",
            points.steps.len()
        )));
    }
    Ok(points)
}

fn regress(
    points: &TrendPoints,
    config: &RegressionConfig,
) -> Result<(RegressionResult, RegressionResult)> {
    let km = linear_estimation(&points.steps, &points.step_errs, &points.km, &points.km_errs, config)?;
    let kc = linear_estimation(&points.steps, &points.step_errs, &points.kc, &points.kc_errs, config)?;
    Ok((km, kc))
}

/// Regress `|km_fit|` and `|kc_fit|` against the step parameter per regime
///
/// A regime containing a failed channel, or fewer than two channels, gets an
/// error entry instead of regressions. The other regimes are unaffected.
///
/// # Errors
/// Returns `FringeError::Config` if a regime names a channel that has no
/// outcome.
pub fn analyze_trends(
    outcomes: &[ChannelOutcome],
    regimes: &[Regime],
    config: &RegressionConfig,
) -> Result<TrendReport> {
    let mut trends = Vec::with_capacity(regimes.len());

    for regime in regimes {
        let members = regime
            .channel_ids
            .iter()
            .map(|id| {
                outcomes.iter().find(|o| &o.channel.id == id).ok_or_else(|| {
                    FringeError::Config(format!(
                        "regime '{}' names unknown channel '{}'",
                        regime.name, id
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let steps = members.iter().map(|o| o.channel.step).collect();
        let step_uncertainties = members.iter().map(|o| o.channel.step_uncertainty).collect();

        let regressions = collect_points(&members).and_then(|points| regress(&points, config));
        let trend = match regressions {
            Ok((km, kc)) => {
                log::info!(
                    "Regime '{}': km slope = {} ± {}, kc slope = {} ± {}",
                    regime.name,
                    km.slope,
                    km.slope_err,
                    kc.slope,
                    kc.slope_err
                );
                RegimeTrend {
                    name: regime.name.clone(),
                    channel_ids: regime.channel_ids.clone(),
                    steps,
                    step_uncertainties,
                    km: Some(km),
                    kc: Some(kc),
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("Regime '{}' skipped: {}", regime.name, e);
                RegimeTrend {
                    name: regime.name.clone(),
                    channel_ids: regime.channel_ids.clone(),
                    steps,
                    step_uncertainties,
                    km: None,
                    kc: None,
                    error: Some(e.to_string()),
                }
            }
        };
        trends.push(trend);
    }

    Ok(TrendReport { regimes: trends })
}
