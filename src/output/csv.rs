use super::{AnalysisReport, Formatter};
use crate::error::{FringeError, Result};

/// Two tables separated by a blank line: channels, then regime regressions
pub struct CsvFormatter;

const CHANNEL_HEADER: [&str; 16] = [
    "channel", "step", "step_err", "km_spectrum", "kc_spectrum", "b", "b_err", "c", "c_err", "d",
    "d_err", "km", "km_err", "kc", "kc_err", "error",
];

const TREND_HEADER: [&str; 11] = [
    "regime",
    "wavenumber",
    "slope",
    "slope_err",
    "intercept",
    "intercept_err",
    "slope_raw",
    "slope_err_raw",
    "intercept_raw",
    "intercept_err_raw",
    "error",
];

fn opt(value: Option<f64>) -> String {
    value.map_or(String::new(), |v| v.to_string())
}

fn table<I>(header: &[&str], rows: I) -> Result<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let to_report_error = |e: ::csv::Error| FringeError::Report(e.to_string());
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(header).map_err(to_report_error)?;
    for row in rows {
        writer.write_record(&row).map_err(to_report_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| FringeError::Report(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| FringeError::Report(e.to_string()))
}

impl Formatter for CsvFormatter {
    fn format(&self, report: &AnalysisReport) -> Result<String> {
        let channels = report.channels.iter().map(|c| {
            let p = c.params;
            let e = c.std_errors;
            vec![
                c.id.clone(),
                c.step.to_string(),
                c.step_uncertainty.to_string(),
                opt(c.spectral.map(|s| s.km)),
                opt(c.spectral.map(|s| s.kc)),
                opt(p.map(|p| p.b)),
                opt(e.map(|e| e.b)),
                opt(p.map(|p| p.c)),
                opt(e.map(|e| e.c)),
                opt(p.map(|p| p.d.abs())),
                opt(e.map(|e| e.d)),
                opt(p.map(|p| p.km.abs())),
                opt(e.map(|e| e.km)),
                opt(p.map(|p| p.kc.abs())),
                opt(e.map(|e| e.kc)),
                c.error.clone().unwrap_or_default(),
            ]
        });

        let trends = report.trends.regimes.iter().flat_map(|regime| {
            [("km", regime.km), ("kc", regime.kc)].map(|(name, result)| {
                vec![
                    regime.name.clone(),
                    name.to_string(),
                    opt(result.map(|r| r.slope)),
                    opt(result.map(|r| r.slope_err)),
                    opt(result.map(|r| r.intercept)),
                    opt(result.map(|r| r.intercept_err)),
                    opt(result.map(|r| r.slope_raw)),
                    opt(result.map(|r| r.slope_err_raw)),
                    opt(result.map(|r| r.intercept_raw)),
                    opt(result.map(|r| r.intercept_err_raw)),
                    regime.error.clone().unwrap_or_default(),
                ]
            })
        });

        Ok(format!(
            "{}\n{}",
            table(&CHANNEL_HEADER, channels)?,
            table(&TREND_HEADER, trends)?
        ))
    }
}
