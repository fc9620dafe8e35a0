use super::{AnalysisReport, Formatter};
use crate::error::{FringeError, Result};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, report: &AnalysisReport) -> Result<String> {
        serde_json::to_string_pretty(report).map_err(|e| FringeError::Report(e.to_string()))
    }
}
