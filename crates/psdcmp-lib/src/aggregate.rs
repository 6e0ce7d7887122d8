use log::warn;

use crate::error::{AnalysisError, Result};
use crate::io::openbci::Recording;
use crate::signal::TimeSeries;

/// Check a channel selection against the recording before any averaging.
pub fn validate_channels(recording: &Recording, channels: &[usize]) -> Result<()> {
    if channels.is_empty() {
        return Err(AnalysisError::EmptyChannelSelection);
    }
    let columns = recording.column_count();
    if let Some(&index) = channels.iter().find(|&&c| c >= columns) {
        return Err(AnalysisError::ChannelOutOfRange { index, columns });
    }
    Ok(())
}

/// Average the selected channels sample by sample into one series.
///
/// A NaN in any selected cell yields NaN for that sample. `scale` is applied
/// to every averaged sample (1.0 leaves values untouched).
pub fn average_channels(
    recording: &Recording,
    channels: &[usize],
    fs: f64,
    scale: f64,
) -> Result<TimeSeries> {
    validate_channels(recording, channels)?;
    let n = channels.len() as f64;
    let data: Vec<f64> = (0..recording.len())
        .map(|row| {
            let sum: f64 = channels.iter().map(|&c| recording.value(row, c)).sum();
            sum / n * scale
        })
        .collect();
    let ts = TimeSeries::new(fs, data);
    let bad = ts.nan_count();
    if bad > 0 {
        warn!("{bad} of {} aggregated samples are NaN", ts.len());
    }
    Ok(ts)
}
