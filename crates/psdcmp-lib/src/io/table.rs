use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::pipeline::ComparisonTable;
use crate::signal::Condition;
use crate::spectrum::ConditionPsd;

pub const FILTER_COLUMN: &str = "Filter";
pub const FREQUENCY_COLUMN: &str = "Frequency (Hz)";

/// Column names of the comparison CSV; downstream tools key on these.
pub fn comparison_headers(subject_a: &str, subject_b: &str) -> Vec<String> {
    vec![
        FILTER_COLUMN.to_string(),
        FREQUENCY_COLUMN.to_string(),
        format!("{subject_a} Z-Score Closed"),
        format!("{subject_a} Z-Score Open"),
        format!("{subject_b} Z-Score Closed"),
        format!("{subject_b} Z-Score Open"),
        "Absolute Delta Closed".to_string(),
        "Absolute Delta Open".to_string(),
        "P-Value Closed".to_string(),
        "P-Value Open".to_string(),
        "Higher Closed".to_string(),
        "Higher Open".to_string(),
    ]
}

/// Write the comparison table as comma-separated text with a header.
pub fn write_comparison<W: Write>(out: W, table: &ComparisonTable) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(out);
    writer.write_record(comparison_headers(&table.subject_a, &table.subject_b))?;
    for row in &table.rows {
        writer.write_record(&[
            row.filter.clone(),
            row.frequency_hz.to_string(),
            row.z_a_closed.to_string(),
            row.z_a_open.to_string(),
            row.z_b_closed.to_string(),
            row.z_b_open.to_string(),
            row.delta_closed.to_string(),
            row.delta_open.to_string(),
            row.p_closed.to_string(),
            row.p_open.to_string(),
            row.higher_closed.clone(),
            row.higher_open.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_comparison_csv(path: &Path, table: &ComparisonTable) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_comparison(file, table).with_context(|| format!("writing {}", path.display()))
}

/// Write per-condition spectra of one recording.
pub fn write_psd_csv(path: &Path, psd: &ConditionPsd) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().from_writer(file);
    writer.write_record([
        FREQUENCY_COLUMN.to_string(),
        format!("{} (dB)", Condition::EyesClosed.label()),
        format!("{} (dB)", Condition::EyesOpen.label()),
    ])?;
    let open = &psd.open.power_db;
    for (i, (freq, closed)) in psd.closed.freqs.iter().zip(&psd.closed.power_db).enumerate() {
        let open = open.get(i).copied().unwrap_or(f64::NAN);
        writer.write_record(&[freq.to_string(), closed.to_string(), open.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

/// A CSV read back as header names plus string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

pub fn read_table_csv(path: &Path) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("opening table {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("parsing rows in {}", path.display()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable { headers, rows })
}
