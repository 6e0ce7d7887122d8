//! Column averages over a written comparison table.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::io::table::{read_table_csv, RawTable, FILTER_COLUMN, FREQUENCY_COLUMN};

/// Mean of one metric column; NaN when the column holds no finite value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMean {
    pub column: String,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub filter: String,
    pub rows: usize,
    pub means: Vec<ColumnMean>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub rows: usize,
    pub overall: Vec<ColumnMean>,
    /// In order of first appearance in the table.
    pub per_filter: Vec<FilterSummary>,
}

fn is_metric_column(name: &str) -> bool {
    name != FILTER_COLUMN && name != FREQUENCY_COLUMN && !name.starts_with("Higher")
}

/// Mean over the parseable, non-NaN cells of `column`.
fn column_mean<'a>(rows: impl Iterator<Item = &'a Vec<String>>, column: usize) -> f64 {
    let (sum, count) = rows
        .filter_map(|row| row.get(column))
        .filter_map(|cell| cell.parse::<f64>().ok())
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn means_for(
    table: &RawTable,
    metrics: &[(usize, &String)],
    filter: Option<&str>,
    filter_col: usize,
) -> Vec<ColumnMean> {
    metrics
        .iter()
        .map(|(idx, name)| {
            let rows = table.rows.iter().filter(|row| {
                filter.map_or(true, |f| row.get(filter_col).map(String::as_str) == Some(f))
            });
            ColumnMean {
                column: (*name).clone(),
                mean: column_mean(rows, *idx),
            }
        })
        .collect()
}

pub fn summarize(table: &RawTable) -> Result<TableSummary> {
    let Some(filter_col) = table.column(FILTER_COLUMN) else {
        bail!("table has no {FILTER_COLUMN:?} column");
    };
    let metrics: Vec<(usize, &String)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, name)| is_metric_column(name))
        .collect();

    let mut filters: Vec<&str> = Vec::new();
    for row in &table.rows {
        if let Some(label) = row.get(filter_col) {
            if !filters.contains(&label.as_str()) {
                filters.push(label.as_str());
            }
        }
    }

    let per_filter = filters
        .iter()
        .map(|label| FilterSummary {
            filter: label.to_string(),
            rows: table
                .rows
                .iter()
                .filter(|row| row.get(filter_col).map(String::as_str) == Some(*label))
                .count(),
            means: means_for(table, &metrics, Some(*label), filter_col),
        })
        .collect();

    Ok(TableSummary {
        rows: table.rows.len(),
        overall: means_for(table, &metrics, None, filter_col),
        per_filter,
    })
}

pub fn summarize_csv(path: &Path) -> Result<TableSummary> {
    let table = read_table_csv(path)?;
    summarize(&table)
}
