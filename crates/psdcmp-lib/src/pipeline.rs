use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::aggregate::{average_channels, validate_channels};
use crate::config::{AnalysisConfig, FilterConfig};
use crate::error::Result;
use crate::filter::condition;
use crate::io::openbci::{read_openbci_tsv, Recording};
use crate::signal::{split_conditions, ConditionSegments};
use crate::spectrum::{psd_db, welch_nperseg, ConditionPsd};
use crate::stats::{compare_subjects, BlockSummary, ComparisonRow};

/// Long-form comparison across all filter configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub subject_a: String,
    pub subject_b: String,
    /// One entry per filter configuration, in declared order.
    pub summaries: Vec<BlockSummary>,
    /// Filter blocks in declared order, ascending frequency within a block.
    pub rows: Vec<ComparisonRow>,
}

/// Aggregate, condition and split one recording under `filter`.
pub fn condition_segments(
    recording: &Recording,
    config: &AnalysisConfig,
    filter: &FilterConfig,
) -> Result<ConditionSegments> {
    let series = average_channels(
        recording,
        &config.channels,
        config.sampling_rate_hz,
        config.scale,
    )?;
    let filtered = condition(&series, filter)?;
    Ok(split_conditions(&filtered))
}

/// Band-limited PSDs of both halves using a shared Welch window.
pub fn segment_spectra(
    segments: &ConditionSegments,
    nperseg: usize,
    config: &AnalysisConfig,
) -> ConditionPsd {
    ConditionPsd {
        closed: psd_db(&segments.closed, nperseg, &config.band),
        open: psd_db(&segments.open, nperseg, &config.band),
    }
}

/// Per-condition spectra of a single recording.
pub fn recording_spectra(
    recording: &Recording,
    config: &AnalysisConfig,
    filter: &FilterConfig,
) -> Result<ConditionPsd> {
    config.validate()?;
    filter.validate(config.sampling_rate_hz)?;
    let segments = condition_segments(recording, config, filter)?;
    let nperseg = welch_nperseg(config.sampling_rate_hz).min(segments.min_len());
    Ok(segment_spectra(&segments, nperseg, config))
}

/// Run every filter configuration over both recordings and stack the
/// results into one table.
///
/// Each configuration starts again from the raw recordings; filters are
/// never chained.
pub fn run_comparison(
    recording_a: &Recording,
    recording_b: &Recording,
    config: &AnalysisConfig,
) -> Result<ComparisonTable> {
    config.validate()?;
    validate_channels(recording_a, &config.channels)?;
    validate_channels(recording_b, &config.channels)?;

    let (name_a, name_b) = (config.subject_a.as_str(), config.subject_b.as_str());
    let mut summaries = Vec::with_capacity(config.filters.len());
    let mut rows = Vec::new();
    for filter in &config.filters {
        let seg_a = condition_segments(recording_a, config, filter)?;
        let seg_b = condition_segments(recording_b, config, filter)?;
        // All four curves must share bins, so they share one window length.
        let nperseg = welch_nperseg(config.sampling_rate_hz)
            .min(seg_a.min_len())
            .min(seg_b.min_len());
        let psd_a = segment_spectra(&seg_a, nperseg, config);
        let psd_b = segment_spectra(&seg_b, nperseg, config);

        let block = compare_subjects(&filter.label, &psd_a, &psd_b, name_a, name_b);
        let s = &block.summary;
        info!(
            "{}: {} bins; ANOVA closed F = {:.4}, p = {:.4e}; ANOVA open F = {:.4}, p = {:.4e}",
            s.filter,
            s.bins,
            s.anova_closed.statistic,
            s.anova_closed.pvalue,
            s.anova_open.statistic,
            s.anova_open.pvalue
        );
        summaries.push(block.summary);
        rows.extend(block.rows);
    }

    Ok(ComparisonTable {
        subject_a: config.subject_a.clone(),
        subject_b: config.subject_b.clone(),
        summaries,
        rows,
    })
}

/// Load both captures from disk and run the comparison.
pub fn compare_files(
    path_a: &Path,
    path_b: &Path,
    config: &AnalysisConfig,
) -> anyhow::Result<ComparisonTable> {
    config.validate().context("invalid analysis configuration")?;
    let recording_a = read_openbci_tsv(path_a, config.has_header)?;
    let recording_b = read_openbci_tsv(path_b, config.has_header)?;
    let table = run_comparison(&recording_a, &recording_b, config).with_context(|| {
        format!(
            "comparing {} with {}",
            path_a.display(),
            path_b.display()
        )
    })?;
    Ok(table)
}
