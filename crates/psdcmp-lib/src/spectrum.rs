use log::{debug, warn};
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::FrequencyBand;
use crate::signal::TimeSeries;

/// Added to every power value before the log so silent bins stay finite.
pub const DB_FLOOR: f64 = 1e-20;

/// Welch analysis window in seconds.
pub const WELCH_WINDOW_S: f64 = 2.0;

/// Power spectral density on a fixed frequency axis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PsdCurve {
    pub freqs: Vec<f64>,
    pub power_db: Vec<f64>,
}

impl PsdCurve {
    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Keep only the bins whose frequency lies in `band` (inclusive).
    pub fn restrict(&self, band: &FrequencyBand) -> PsdCurve {
        let (freqs, power_db) = self
            .freqs
            .iter()
            .zip(&self.power_db)
            .filter(|(f, _)| band.contains(**f))
            .map(|(f, p)| (*f, *p))
            .unzip();
        PsdCurve { freqs, power_db }
    }

    pub fn points(&self) -> Vec<[f64; 2]> {
        self.freqs
            .iter()
            .zip(&self.power_db)
            .map(|(f, p)| [*f, *p])
            .collect()
    }
}

/// Band-limited spectra of one recording's two conditions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionPsd {
    pub closed: PsdCurve,
    pub open: PsdCurve,
}

/// Default Welch segment length for a sampling rate: two seconds of samples.
pub fn welch_nperseg(fs: f64) -> usize {
    (fs * WELCH_WINDOW_S).round() as usize
}

/// Welch PSD with a periodic Hann window and 50 % overlap.
///
/// Each segment has its mean removed before windowing; power is scaled to a
/// one-sided density (units²/Hz) and averaged over segments. A segment
/// length longer than the signal is clamped to the signal length.
pub fn welch_psd(signal: &[f64], fs: f64, nperseg: usize) -> (Vec<f64>, Vec<f64>) {
    let n = signal.len();
    if n == 0 || nperseg == 0 {
        return (Vec::new(), Vec::new());
    }
    let window = if nperseg > n {
        warn!("nperseg = {nperseg} is greater than input length = {n}, using nperseg = {n}");
        n
    } else {
        nperseg
    };
    let step = window - window / 2;
    let window_func = hann(window);
    let scale = 1.0 / (fs * window_func.iter().map(|w| w * w).sum::<f64>());

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(window);
    let mut spectrum = r2c.make_output_vec();
    let bins = spectrum.len();
    let freqs: Vec<f64> = (0..bins).map(|k| k as f64 * fs / window as f64).collect();
    let mut powers = vec![0.0; bins];

    let mut segments = 0;
    let mut pos = 0;
    while pos + window <= n {
        let slice = &signal[pos..pos + window];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let mut frame: Vec<f64> = slice
            .iter()
            .zip(window_func.iter())
            .map(|(x, w)| (x - mean) * w)
            .collect();
        if r2c.process(&mut frame, &mut spectrum).is_err() {
            // Buffer sizes come from the planner, so this cannot trigger.
            return (freqs, vec![f64::NAN; bins]);
        }
        for (k, val) in spectrum.iter().enumerate() {
            let one_sided = k == 0 || (window % 2 == 0 && k == window / 2);
            let factor = if one_sided { 1.0 } else { 2.0 };
            powers[k] += factor * val.norm_sqr() * scale;
        }
        segments += 1;
        pos += step;
    }
    for p in powers.iter_mut() {
        *p /= segments as f64;
    }
    debug!("welch: {segments} segments of {window} samples, {bins} bins");
    (freqs, powers)
}

/// Convert power to decibels with the [`DB_FLOOR`] guard.
pub fn to_db(powers: &[f64]) -> Vec<f64> {
    powers.iter().map(|p| 10.0 * (p + DB_FLOOR).log10()).collect()
}

/// Welch PSD of a series in dB, restricted to `band`.
pub fn psd_db(ts: &TimeSeries, nperseg: usize, band: &FrequencyBand) -> PsdCurve {
    let (freqs, powers) = welch_psd(&ts.data, ts.fs, nperseg);
    PsdCurve {
        freqs,
        power_db: to_db(&powers),
    }
    .restrict(band)
}

/// One-sided periodogram of the whole series in dB, dropping the first
/// `skip_bins` bins (DC and slow drift).
pub fn periodogram_db(ts: &TimeSeries, skip_bins: usize) -> PsdCurve {
    let n = ts.len();
    if n == 0 {
        return PsdCurve::default();
    }
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(n);
    let mut frame = ts.data.clone();
    let mut spectrum = r2c.make_output_vec();
    let scale = 2.0 / (n as f64 * ts.fs);
    let powers: Vec<f64> = match r2c.process(&mut frame, &mut spectrum) {
        Ok(()) => spectrum.iter().map(|v| scale * v.norm_sqr()).collect(),
        Err(_) => vec![f64::NAN; spectrum.len()],
    };
    let freqs: Vec<f64> = (0..powers.len())
        .map(|k| k as f64 * ts.fs / n as f64)
        .collect();
    let skip = skip_bins.min(freqs.len());
    PsdCurve {
        freqs: freqs[skip..].to_vec(),
        power_db: to_db(&powers[skip..]),
    }
}

/// Periodic Hann window.
fn hann(size: usize) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (size as f64)).cos()))
        .collect()
}
