//! Raw scan tables
//!
//! A dataset is a CSV file with one column pair per channel: `x<label>` holds
//! the positions in meters and `I<label>` the intensities. Channels may have
//! different lengths; shorter columns are padded with empty cells, which are
//! dropped on load.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::error::{FringeError, Result};

/// One channel's raw positions and intensities
#[derive(Debug, Clone, PartialEq)]
pub struct RawScan {
    pub label: String,
    pub x: Vec<f64>,
    pub intensity: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: BTreeMap<String, Vec<f64>>,
}

impl Dataset {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| FringeError::Dataset(format!("cannot read header: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for name in &headers {
            if columns.insert(name.clone(), Vec::new()).is_some() {
                return Err(FringeError::Dataset(format!("duplicate column '{}'", name)));
            }
        }

        for (row, record) in csv_reader.records().enumerate() {
            let record =
                record.map_err(|e| FringeError::Dataset(format!("row {}: {}", row + 2, e)))?;
            for (cell, name) in record.iter().zip(headers.iter()) {
                if cell.is_empty() {
                    continue;
                }
                let value: f64 = cell.parse().map_err(|_| {
                    FringeError::Dataset(format!(
                        "row {}, column '{}': '{}' is not a number",
                        row + 2,
                        name,
                        cell
                    ))
                })?;
                if let Some(column) = columns.get_mut(name) {
                    column.push(value);
                }
            }
        }

        Ok(Self { columns })
    }

    /// Labels that have both an `x` and an `I` column
    pub fn labels(&self) -> Vec<String> {
        self.columns
            .keys()
            .filter_map(|name| name.strip_prefix('x'))
            .filter(|label| self.columns.contains_key(&format!("I{}", label)))
            .map(str::to_string)
            .collect()
    }

    /// Raw scan for channel `label`
    ///
    /// # Errors
    /// Returns `FringeError::Dataset` if either column is missing or the two
    /// columns hold a different number of values.
    pub fn scan(&self, label: &str) -> Result<RawScan> {
        let column = |name: String| {
            self.columns
                .get(&name)
                .ok_or_else(|| FringeError::Dataset(format!("missing column '{}'", name)))
        };
        let x = column(format!("x{}", label))?;
        let intensity = column(format!("I{}", label))?;

        if x.len() != intensity.len() {
            return Err(FringeError::Dataset(format!(
                "channel '{}' has {} positions but {} intensities",
                label,
                x.len(),
                intensity.len()
            )));
        }

        Ok(RawScan {
            label: label.to_string(),
            x: x.clone(),
            intensity: intensity.clone(),
        })
    }
}

/// Write scans as `x<label>,I<label>` column pairs, padding short channels
pub fn write_dataset<W: io::Write>(writer: W, scans: &[RawScan]) -> Result<()> {
    let to_dataset_error = |e: csv::Error| FringeError::Dataset(e.to_string());
    let mut csv_writer = csv::Writer::from_writer(writer);

    let header: Vec<String> = scans
        .iter()
        .flat_map(|s| [format!("x{}", s.label), format!("I{}", s.label)])
        .collect();
    csv_writer.write_record(&header).map_err(to_dataset_error)?;

    let rows = scans.iter().map(|s| s.x.len()).max().unwrap_or(0);
    for row in 0..rows {
        let record: Vec<String> = scans
            .iter()
            .flat_map(|s| {
                let cell = |values: &[f64]| {
                    values.get(row).map(|v| v.to_string()).unwrap_or_default()
                };
                [cell(&s.x), cell(&s.intensity)]
            })
            .collect();
        csv_writer.write_record(&record).map_err(to_dataset_error)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
x1,I1,x50,I50
-0.002,0.1,-0.001,0.3
0.0,0.9,0.0,1.0
0.002,0.2,,
";

    #[test]
    fn test_reads_column_pairs_and_drops_empty_cells() {
        let dataset = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(dataset.labels(), vec!["1".to_string(), "50".to_string()]);

        let scan = dataset.scan("1").unwrap();
        assert_eq!(scan.x, vec![-0.002, 0.0, 0.002]);
        assert_eq!(scan.intensity, vec![0.1, 0.9, 0.2]);

        let scan = dataset.scan("50").unwrap();
        assert_eq!(scan.x, vec![-0.001, 0.0]);
        assert_eq!(scan.intensity, vec![0.3, 1.0]);
    }

    #[test]
    fn test_missing_channel_is_dataset_error() {
        let dataset = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert!(matches!(dataset.scan("200"), Err(FringeError::Dataset(_))));
    }

    #[test]
    fn test_non_numeric_cell_rejected() {
        let content = "x1,I1\n0.0,abc\n";
        assert!(matches!(
            Dataset::from_reader(content.as_bytes()),
            Err(FringeError::Dataset(_))
        ));
    }

    #[test]
    fn test_unbalanced_pair_rejected() {
        let content = "x1,I1\n0.0,1.0\n0.1,\n";
        let dataset = Dataset::from_reader(content.as_bytes()).unwrap();
        assert!(matches!(dataset.scan("1"), Err(FringeError::Dataset(_))));
    }

    #[test]
    fn test_write_then_read_pads_short_channels() {
        let scans = vec![
            RawScan {
                label: "2".to_string(),
                x: vec![0.0, 0.5, 1.0],
                intensity: vec![1.0, 2.0, 3.0],
            },
            RawScan {
                label: "100".to_string(),
                x: vec![0.25],
                intensity: vec![4.0],
            },
        ];
        let mut buffer = Vec::new();
        write_dataset(&mut buffer, &scans).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("x2,I2,x100,I100\n"));
        assert!(text.contains("1,3,,\n"));

        let dataset = Dataset::from_reader(buffer.as_slice()).unwrap();
        assert_eq!(dataset.scan("2").unwrap(), scans[0]);
        assert_eq!(dataset.scan("100").unwrap(), scans[1]);
    }
}
