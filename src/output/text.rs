use std::fmt::{self, Write};

use super::{AnalysisReport, Formatter};
use crate::error::{FringeError, Result};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, report: &AnalysisReport) -> Result<String> {
        let mut out = String::new();
        self.render(report, &mut out)
            .map_err(|e| FringeError::Report(e.to_string()))?;
        Ok(out)
    }
}

impl TextFormatter {
    fn render(&self, report: &AnalysisReport, out: &mut String) -> fmt::Result {
        writeln!(out, "=== Fringe analysis: {} ===", report.source)?;
        writeln!(out, "Generated: {}", report.generated_at)?;
        writeln!(out)?;

        for channel in &report.channels {
            write!(
                out,
                "Channel {:>4} (Δm = {} ± {:.3}): ",
                channel.id, channel.step, channel.step_uncertainty
            )?;
            match (&channel.params, &channel.std_errors) {
                (Some(p), Some(e)) => {
                    writeln!(
                        out,
                        "km = {:>8.2} ± {:<6.2} kc = {:>8.2} ± {:<6.2} rad/m",
                        p.km.abs(),
                        e.km,
                        p.kc.abs(),
                        e.kc
                    )?;
                    if self.verbose {
                        if let Some(s) = &channel.spectral {
                            writeln!(
                                out,
                                "    spectral peaks: km = {:.2}, kc = {:.2} rad/m",
                                s.km, s.kc
                            )?;
                        }
                        writeln!(
                            out,
                            "    B = {:.4} ± {:.4}, C = {:.4} ± {:.4}, D = {:.2} ± {:.2}",
                            p.b,
                            e.b,
                            p.c,
                            e.c,
                            p.d.abs(),
                            e.d
                        )?;
                        if let (Some(ssr), Some(iterations)) =
                            (channel.sum_squared_residuals, channel.iterations)
                        {
                            writeln!(
                                out,
                                "    SSR = {:.4e} after {} iterations over {} samples",
                                ssr,
                                iterations,
                                channel.samples.unwrap_or(0)
                            )?;
                        }
                        if let Some(r) = &channel.residuals {
                            writeln!(
                                out,
                                "    residuals: rms {:.4e}, min {:.4e}, max {:.4e}",
                                r.rms, r.min, r.max
                            )?;
                        }
                    }
                }
                _ => {
                    writeln!(
                        out,
                        "FAILED: {}",
                        channel.error.as_deref().unwrap_or("no fit")
                    )?;
                }
            }
        }

        for regime in &report.trends.regimes {
            writeln!(out)?;
            writeln!(out, "Regime '{}' (Δm = {:?})", regime.name, regime.steps)?;
            match (&regime.km, &regime.kc) {
                (Some(km), Some(kc)) => {
                    writeln!(
                        out,
                        "  km = ({} ± {})·Δm + ({} ± {})",
                        km.slope, km.slope_err, km.intercept, km.intercept_err
                    )?;
                    writeln!(
                        out,
                        "  kc = ({} ± {})·Δm + ({} ± {})",
                        kc.slope, kc.slope_err, kc.intercept, kc.intercept_err
                    )?;
                }
                _ => {
                    writeln!(
                        out,
                        "  no regression: {}",
                        regime.error.as_deref().unwrap_or("unknown")
                    )?;
                }
            }
        }

        Ok(())
    }
}
