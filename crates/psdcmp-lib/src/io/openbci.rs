use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use log::debug;
use std::io::Read;
use std::path::Path;

/// Microvolts per ADC count for the OpenBCI Cyton board at gain 24.
pub const CYTON_SCALE_UV: f64 = 0.02235;

/// Raw rows of an OpenBCI capture with every cell coerced to `f64`.
///
/// Cells that do not parse (timestamps, blanks, markers) are NaN so that
/// downstream averages surface the problem instead of hiding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    rows: Vec<Vec<f64>>,
    columns: usize,
}

impl Recording {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let columns = rows.first().map(Vec::len).unwrap_or(0);
        Self { rows, columns }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column count of the first row, used to validate channel selections.
    pub fn column_count(&self) -> usize {
        self.columns
    }

    /// Cell `(row, column)`; NaN when the row is shorter than `column`.
    pub fn value(&self, row: usize, column: usize) -> f64 {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .unwrap_or(f64::NAN)
    }
}

/// Load a tab-delimited OpenBCI capture.
///
/// With `has_header` the first line is skipped; otherwise every line is data.
pub fn read_openbci_tsv(path: &Path, has_header: bool) -> Result<Recording> {
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let recording =
        parse_openbci_tsv(file, has_header).with_context(|| format!("reading {}", path.display()))?;
    debug!(
        "loaded {} rows x {} columns from {}",
        recording.len(),
        recording.column_count(),
        path.display()
    );
    Ok(recording)
}

/// Parse capture text from any reader.
pub fn parse_openbci_tsv<R: Read>(reader: R, has_header: bool) -> Result<Recording> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(has_header)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'%'))
        .from_reader(reader);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("reading record")?;
        let row = record
            .iter()
            .map(|cell| cell.parse::<f64>().unwrap_or(f64::NAN))
            .collect();
        rows.push(row);
    }
    Ok(Recording::from_rows(rows))
}
