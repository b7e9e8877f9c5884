//! Trial Files
//!
//! JSON trial files (metadata + samples + optional derived channels), and
//! tab-delimited import/export of sample tables.

use crate::series::{DerivedChannels, Sample, Series};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

/// Current trial file format version
pub const CURRENT_FORMAT_VERSION: &str = "1.0";

/// Column names of the raw sample table
pub const RAW_COLUMNS: [&str; 4] = ["time", "x", "y", "pressure"];

/// Column names appended when derived channels are exported
pub const DERIVED_COLUMNS: [&str; 7] = [
    "x_filtered",
    "y_filtered",
    "pressure_filtered",
    "x_velocity",
    "y_velocity",
    "xy_velocity",
    "sample_state",
];

/// Trial metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialMetadata {
    pub id: Uuid,
    pub name: String,
    /// Where the samples came from (file path, device name)
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sample_count: usize,
    /// Seconds between first and last sample
    pub duration_secs: f64,
    pub format_version: String,
}

impl TrialMetadata {
    pub fn new(name: String, source: Option<String>) -> Self {
        Self {
            name,
            source,
            ..Self::default()
        }
    }
}

impl Default for TrialMetadata {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            source: None,
            created_at: Utc::now(),
            sample_count: 0,
            duration_secs: 0.0,
            format_version: CURRENT_FORMAT_VERSION.to_string(),
        }
    }
}

/// One trial as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialFile {
    pub metadata: TrialMetadata,
    pub samples: Vec<Sample>,
    /// Snapshot of the derived channels at save time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedChannels>,
}

impl TrialFile {
    /// Snapshot a series
    pub fn from_series(name: String, source: Option<String>, series: &Series) -> Self {
        let mut metadata = TrialMetadata::new(name, source);
        metadata.sample_count = series.len();
        metadata.duration_secs = series.duration();
        Self {
            metadata,
            samples: series.samples().to_vec(),
            derived: series.derived().cloned(),
        }
    }

    /// Rebuild the series. Stored derived channels are reattached when they
    /// still align with the samples.
    pub fn into_series(self) -> crate::Result<Series> {
        let mut series = Series::new(self.samples)?;
        if let Some(derived) = self.derived {
            if derived.is_aligned_with(series.len()) {
                series.set_derived(derived)?;
            } else {
                tracing::warn!(
                    name = %self.metadata.name,
                    "stored derived channels do not match samples; dropping them"
                );
            }
        }
        Ok(series)
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a trial file.
    ///
    /// Unknown format versions are loaded anyway with a warning.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let trial: TrialFile = serde_json::from_str(&content)?;
        if trial.metadata.format_version != CURRENT_FORMAT_VERSION {
            tracing::warn!(
                name = %trial.metadata.name,
                found = %trial.metadata.format_version,
                expected = CURRENT_FORMAT_VERSION,
                "Trial file has different format version; some fields may use default values"
            );
        }
        Ok(trial)
    }
}

/// Parse a tab- or whitespace-delimited `time x y pressure` table.
///
/// Blank lines and `#` comments are skipped, as is the first row when none of
/// its sample columns is numeric. Extra
/// columns after pressure are ignored.
pub fn parse_samples(text: &str) -> crate::Result<Vec<Sample>> {
    let mut samples = Vec::new();
    let mut seen_row = false;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let first_row = !seen_row;
        seen_row = true;
        if first_row && is_header(&fields) {
            continue;
        }
        if fields.len() < RAW_COLUMNS.len() {
            return Err(crate::Error::Parse {
                line: line_no,
                message: format!("expected {} columns, found {}", RAW_COLUMNS.len(), fields.len()),
            });
        }

        let mut values = [0.0f64; 4];
        for (slot, (field, column)) in values.iter_mut().zip(fields.iter().zip(RAW_COLUMNS)) {
            let value: f64 = field.parse().map_err(|_| crate::Error::Parse {
                line: line_no,
                message: format!("invalid {column} value '{field}'"),
            })?;
            if !value.is_finite() {
                return Err(crate::Error::Parse {
                    line: line_no,
                    message: format!("{column} must be finite, got '{field}'"),
                });
            }
            *slot = value;
        }

        let [time, x, y, pressure] = values;
        if pressure < 0.0 {
            return Err(crate::Error::Parse {
                line: line_no,
                message: format!("pressure must be >= 0, got {pressure}"),
            });
        }
        samples.push(Sample::new(time, x, y, pressure));
    }

    Ok(samples)
}

/// A header row has no numeric value in any of the sample columns
fn is_header(fields: &[&str]) -> bool {
    fields
        .iter()
        .take(RAW_COLUMNS.len())
        .all(|f| f.parse::<f64>().is_err())
}

/// Read a sample table from disk into a series
pub fn import_samples(path: &Path) -> crate::Result<Series> {
    let text = std::fs::read_to_string(path)?;
    Series::new(parse_samples(&text)?)
}

/// Render the series as a tab-delimited table. Derived columns are included
/// when the series has been processed.
pub fn format_table(series: &Series) -> String {
    let derived = series.derived();
    let mut out = String::new();

    out.push_str(&RAW_COLUMNS.join("\t"));
    if derived.is_some() {
        out.push('\t');
        out.push_str(&DERIVED_COLUMNS.join("\t"));
    }
    out.push('\n');

    for (i, s) in series.samples().iter().enumerate() {
        let _ = write!(out, "{}\t{}\t{}\t{}", s.time, s.x, s.y, s.pressure);
        if let Some(d) = derived {
            let _ = write!(
                out,
                "\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                d.x_filtered[i],
                d.y_filtered[i],
                d.pressure_filtered[i],
                d.x_velocity[i],
                d.y_velocity[i],
                d.xy_velocity[i],
                d.sample_state[i].bits()
            );
        }
        out.push('\n');
    }

    out
}

/// Write the tab-delimited table to `writer`
pub fn export_table<W: Write>(series: &Series, mut writer: W) -> crate::Result<()> {
    writer.write_all(format_table(series).as_bytes())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SeriesProcessor;
    use crate::Error;
    use tempfile::TempDir;

    const TABLE: &str = "\
# pen samples
time\tx\ty\tpressure
0.000\t10.0\t20.0\t0
0.005\t10.5\t20.0\t0.12

0.010\t11.0\t20.5\t0.30
";

    #[test]
    fn test_parse_samples_skips_header_and_comments() {
        let samples = parse_samples(TABLE).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1], Sample::new(0.005, 10.5, 20.0, 0.12));
    }

    #[test]
    fn test_parse_samples_reports_line_numbers() {
        let text = "0.0 1 2 0\n0.1 1 x 0\n";
        match parse_samples(text) {
            Err(Error::Parse { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("y"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_samples_rejects_short_rows_and_negative_pressure() {
        assert!(matches!(parse_samples("0.0 1 2\n"), Err(Error::Parse { line: 1, .. })));
        assert!(matches!(parse_samples("0.0 1 2 -0.5\n"), Err(Error::Parse { line: 1, .. })));
    }

    #[test]
    fn test_parse_samples_rejects_malformed_first_row() {
        let text = "0.0x\t1\t2\t0.5\n0.01\t2\t2\t0.5\n";
        match parse_samples(text) {
            Err(Error::Parse { line, message }) => {
                assert_eq!(line, 1);
                assert!(message.contains("time"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_samples_allows_one_header_only() {
        let text = "time x y pressure\nbogus row here x\n0.0 1 2 0\n";
        assert!(matches!(parse_samples(text), Err(Error::Parse { line: 2, .. })));

        // comments before the header don't count as rows
        let samples = parse_samples("# tablet\n\ntime x y pressure\n0.0 1 2 0\n").unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_parse_samples_rejects_non_finite_values() {
        assert!(matches!(parse_samples("0.0 1 2 0\nNaN 1 2 0\n"), Err(Error::Parse { line: 2, .. })));
        assert!(matches!(parse_samples("0.0 1 2 NaN\n"), Err(Error::Parse { line: 1, .. })));
        assert!(matches!(parse_samples("0.0 inf 2 0\n"), Err(Error::Parse { line: 1, .. })));
    }

    #[test]
    fn test_parse_samples_ignores_extra_columns() {
        let samples = parse_samples("0.0 1 2 0.5 99 100\n").unwrap();
        assert_eq!(samples, vec![Sample::new(0.0, 1.0, 2.0, 0.5)]);
    }

    #[test]
    fn test_format_table_raw_only() {
        let series = Series::new(parse_samples(TABLE).unwrap()).unwrap();
        let table = format_table(&series);
        let mut lines = table.lines();
        assert_eq!(lines.next(), Some("time\tx\ty\tpressure"));
        assert_eq!(lines.count(), 3);
    }

    #[test]
    fn test_format_table_with_derived_columns() {
        let mut series = Series::new(parse_samples(TABLE).unwrap()).unwrap();
        SeriesProcessor::default().process(&mut series).unwrap();

        let table = format_table(&series);
        let header: Vec<&str> = table.lines().next().unwrap().split('\t').collect();
        assert_eq!(header.len(), 11);
        assert_eq!(header[10], "sample_state");

        let first: Vec<&str> = table.lines().nth(1).unwrap().split('\t').collect();
        // FIRST_ENTER | FIRST_HOVER
        assert_eq!(first[10], "3");
    }

    #[test]
    fn test_import_samples_rejects_unordered_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, "0.1 0 0 0\n0.0 0 0 0\n").unwrap();
        assert!(matches!(import_samples(&path), Err(Error::UnorderedSamples { .. })));
    }

    #[test]
    fn test_save_and_load_trial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trials").join("trial_01.json");

        let mut series = Series::new(parse_samples(TABLE).unwrap()).unwrap();
        SeriesProcessor::default().process(&mut series).unwrap();

        let trial = TrialFile::from_series("trial_01".to_string(), Some("tablet".to_string()), &series);
        trial.save(&path).unwrap();

        let loaded = TrialFile::load(&path).unwrap();
        assert_eq!(loaded.metadata.name, "trial_01");
        assert_eq!(loaded.metadata.sample_count, 3);
        assert_eq!(loaded.metadata.format_version, CURRENT_FORMAT_VERSION);

        let restored = loaded.into_series().unwrap();
        assert_eq!(restored.samples(), series.samples());
        assert_eq!(restored.derived(), series.derived());
    }

    #[test]
    fn test_misaligned_derived_channels_are_dropped() {
        let series = Series::new(parse_samples(TABLE).unwrap()).unwrap();
        let mut trial = TrialFile::from_series("t".to_string(), None, &series);
        trial.derived = Some(DerivedChannels::default());

        let restored = trial.into_series().unwrap();
        assert!(restored.derived().is_none());
    }

    #[test]
    fn test_load_tolerates_missing_metadata_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.json");
        std::fs::write(
            &path,
            r#"{"metadata":{"name":"legacy","format_version":"0.9"},"samples":[{"time":0.0,"x":1.0,"y":2.0,"pressure":0.0}]}"#,
        )
        .unwrap();

        let trial = TrialFile::load(&path).unwrap();
        assert_eq!(trial.metadata.name, "legacy");
        assert_eq!(trial.samples.len(), 1);
        assert!(trial.derived.is_none());
    }
}
