mod csv;
mod json;
mod text;

use chrono::Utc;
use serde::Serialize;

use crate::error::Result;
use crate::fitting::FringeParams;
use crate::processing::{ChannelOutcome, ResidualSummary, TrendReport};
use crate::signal_processing::spectrum::WavenumberEstimate;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// One channel's row in a report
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub id: String,
    pub step: f64,
    pub step_uncertainty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectral: Option<WavenumberEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<FringeParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_errors: Option<FringeParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum_squared_residuals: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residuals: Option<ResidualSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelSummary {
    pub fn from_outcome(outcome: &ChannelOutcome) -> Self {
        let mut summary = Self {
            id: outcome.channel.id.clone(),
            step: outcome.channel.step,
            step_uncertainty: outcome.channel.step_uncertainty,
            samples: None,
            spectral: None,
            params: None,
            std_errors: None,
            sum_squared_residuals: None,
            iterations: None,
            residuals: None,
            error: None,
        };
        match &outcome.result {
            Ok(analysis) => {
                summary.samples = Some(analysis.filtered.len());
                summary.spectral = Some(analysis.estimate);
                summary.params = Some(analysis.fit.params);
                summary.std_errors = Some(analysis.fit.std_errors);
                summary.sum_squared_residuals = Some(analysis.fit.sum_squared_residuals);
                summary.iterations = Some(analysis.fit.iterations);
                summary.residuals = Some(analysis.residuals);
            }
            Err(e) => summary.error = Some(e.to_string()),
        }
        summary
    }
}

/// Complete result of one dataset analysis
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub source: String,
    pub channels: Vec<ChannelSummary>,
    pub trends: TrendReport,
}

impl AnalysisReport {
    pub fn new(source: &str, outcomes: &[ChannelOutcome], trends: TrendReport) -> Self {
        Self {
            generated_at: iso8601_timestamp(),
            source: source.to_string(),
            channels: outcomes.iter().map(ChannelSummary::from_outcome).collect(),
            trends,
        }
    }
}

pub trait Formatter: Send {
    fn format(&self, report: &AnalysisReport) -> Result<String>;
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
pub(crate) mod test_report {
    use super::*;
    use crate::fitting::{RegressionResult, linear_estimation};
    use crate::config::RegressionConfig;
    use crate::processing::RegimeTrend;

    fn regression() -> RegressionResult {
        linear_estimation(
            &[1.0, 2.0, 3.0],
            &[0.1, 0.1, 0.1],
            &[10.2, 19.9, 30.1],
            &[0.3, 0.3, 0.3],
            &RegressionConfig::default(),
        )
        .unwrap()
    }

    pub(crate) fn sample_report() -> AnalysisReport {
        let params = FringeParams {
            b: 1.01,
            c: 0.98,
            d: 201.5,
            km: 99.2,
            kc: 1000.4,
        };
        let errors = FringeParams {
            b: 0.01,
            c: 0.02,
            d: 1.5,
            km: 0.8,
            kc: 0.3,
        };
        let good = ChannelSummary {
            id: "1".to_string(),
            step: 1.0,
            step_uncertainty: 1.36,
            samples: Some(499),
            spectral: Some(WavenumberEstimate {
                km: 78.5,
                kc: 1020.5,
            }),
            params: Some(params),
            std_errors: Some(errors),
            sum_squared_residuals: Some(0.012),
            iterations: Some(7),
            residuals: None,
            error: None,
        };
        let bad = ChannelSummary {
            id: "2".to_string(),
            step: 2.0,
            step_uncertainty: 0.7,
            samples: None,
            spectral: None,
            params: None,
            std_errors: None,
            sum_squared_residuals: None,
            iterations: None,
            residuals: None,
            error: Some("Degenerate input: intensity is constant, 0 to 0".to_string()),
        };
        AnalysisReport {
            generated_at: "2026-01-01T00:00:00.000Z".to_string(),
            source: "data.csv".to_string(),
            channels: vec![good, bad],
            trends: TrendReport {
                regimes: vec![
                    RegimeTrend {
                        name: "small steps".to_string(),
                        channel_ids: vec!["1".to_string(), "2".to_string(), "3".to_string()],
                        steps: vec![1.0, 2.0, 3.0],
                        step_uncertainties: vec![0.1, 0.1, 0.1],
                        km: Some(regression()),
                        kc: Some(regression()),
                        error: None,
                    },
                    RegimeTrend {
                        name: "large steps".to_string(),
                        channel_ids: vec!["50".to_string()],
                        steps: vec![50.0],
                        step_uncertainties: vec![0.5],
                        km: None,
                        kc: None,
                        error: Some("Configuration error: 1 channel(s) cannot define a trend".to_string()),
                    },
                ],
            },
        }
    }
}
