use serde::{Deserialize, Serialize};

/// Basic typed time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
    /// Number of samples that are NaN (malformed cells upstream).
    pub fn nan_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

/// The two behavioural states recorded back to back in one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    EyesClosed,
    EyesOpen,
}

impl Condition {
    pub fn label(&self) -> &'static str {
        match self {
            Condition::EyesClosed => "Closed",
            Condition::EyesOpen => "Open",
        }
    }
}

/// A recording split by time into its eyes-closed and eyes-open halves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSegments {
    pub closed: TimeSeries,
    pub open: TimeSeries,
}

impl ConditionSegments {
    pub fn get(&self, condition: Condition) -> &TimeSeries {
        match condition {
            Condition::EyesClosed => &self.closed,
            Condition::EyesOpen => &self.open,
        }
    }

    /// Length of the shorter half.
    pub fn min_len(&self) -> usize {
        self.closed.len().min(self.open.len())
    }
}

/// Split a series into `[0, N/2)` (closed) and `[N/2, N)` (open).
///
/// The odd middle sample lands in the open half. Never fails; a series with
/// fewer than two samples yields an empty closed half.
pub fn split_conditions(ts: &TimeSeries) -> ConditionSegments {
    let half = ts.len() / 2;
    let (closed, open) = ts.data.split_at(half);
    ConditionSegments {
        closed: TimeSeries::new(ts.fs, closed.to_vec()),
        open: TimeSeries::new(ts.fs, open.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> TimeSeries {
        TimeSeries::new(250.0, (0..n).map(|i| i as f64).collect())
    }

    #[test]
    fn even_split_has_equal_halves() {
        let parts = split_conditions(&ramp(500));
        assert_eq!(parts.closed.len(), 250);
        assert_eq!(parts.open.len(), 250);
        assert_eq!(parts.open.data[0], 250.0);
    }

    #[test]
    fn odd_split_gives_extra_sample_to_open() {
        let ts = ramp(7);
        let parts = split_conditions(&ts);
        assert_eq!(parts.closed.len(), 3);
        assert_eq!(parts.open.len(), 4);
        let joined: Vec<f64> = parts
            .closed
            .data
            .iter()
            .chain(parts.open.data.iter())
            .copied()
            .collect();
        assert_eq!(joined, ts.data);
    }

    #[test]
    fn degenerate_lengths_do_not_panic() {
        let single = split_conditions(&ramp(1));
        assert!(single.closed.is_empty());
        assert_eq!(single.open.len(), 1);

        let empty = split_conditions(&ramp(0));
        assert!(empty.closed.is_empty());
        assert!(empty.open.is_empty());
        assert_eq!(empty.min_len(), 0);
    }

    #[test]
    fn segments_keep_sampling_rate() {
        let parts = split_conditions(&ramp(10));
        assert_eq!(parts.get(Condition::EyesClosed).fs, 250.0);
        assert_eq!(parts.get(Condition::EyesOpen).duration(), 5.0 / 250.0);
    }
}
