//! Butterworth design and zero-phase filtering.
//!
//! Coefficients come from the analog Butterworth prototype mapped through a
//! pre-warped bilinear transform.

use log::debug;
use realfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::{FilterConfig, FilterKind};
use crate::error::{AnalysisError, Result};
use crate::signal::TimeSeries;

/// Order used by every conditioning filter.
pub const BUTTERWORTH_ORDER: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    LowPass,
    HighPass,
}

/// IIR filter in transfer-function form, `a[0] == 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFunction {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl TransferFunction {
    /// Magnitude response at normalized frequency `w` (1.0 = Nyquist).
    pub fn gain_at(&self, w: f64) -> f64 {
        let z = Complex64::from_polar(1.0, -PI * w);
        let eval = |coeffs: &[f64]| {
            coeffs
                .iter()
                .rev()
                .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + c)
        };
        (eval(&self.b) / eval(&self.a)).norm()
    }

    /// Number of samples of odd extension used by [`filtfilt`].
    pub fn padlen(&self) -> usize {
        3 * self.a.len().max(self.b.len())
    }
}

/// Design a digital Butterworth filter; `wn` is the cutoff over Nyquist.
pub fn butter(order: usize, wn: f64, response: Response) -> TransferFunction {
    let one = Complex64::new(1.0, 0.0);
    // Analog prototype poles on the left half of the unit circle.
    let n = order as f64;
    let proto: Vec<Complex64> = (0..order)
        .map(|i| {
            let m = 2.0 * i as f64 - n + 1.0;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect();

    // Pre-warp for a bilinear transform with fs = 2.
    let fs2 = 4.0;
    let warped = fs2 * (PI * wn / 2.0).tan();

    let (zeros, poles, gain) = match response {
        Response::LowPass => {
            let poles: Vec<Complex64> = proto.iter().map(|&p| p * warped).collect();
            (Vec::new(), poles, warped.powi(order as i32))
        }
        Response::HighPass => {
            let poles: Vec<Complex64> = proto.iter().map(|&p| warped / p).collect();
            let prod_neg: Complex64 = proto.iter().map(|&p| -p).product();
            (vec![Complex64::new(0.0, 0.0); order], poles, (one / prod_neg).re)
        }
    };

    let z_d: Vec<Complex64> = zeros
        .iter()
        .map(|&z| (fs2 + z) / (fs2 - z))
        .chain(std::iter::repeat(-one).take(poles.len() - zeros.len()))
        .collect();
    let p_d: Vec<Complex64> = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    let num: Complex64 = zeros.iter().map(|&z| fs2 - z).product();
    let den: Complex64 = poles.iter().map(|&p| fs2 - p).product();
    let k_d = gain * (num / den).re;

    TransferFunction {
        b: poly(&z_d).iter().map(|c| c.re * k_d).collect(),
        a: poly(&p_d).iter().map(|c| c.re).collect(),
    }
}

/// Monic polynomial coefficients (highest power first) from its roots.
fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs
}

/// Direct form II transposed, starting from state `zi`.
fn lfilter(tf: &TransferFunction, x: &[f64], zi: &[f64]) -> Vec<f64> {
    let (b, a) = (&tf.b, &tf.a);
    let n = b.len();
    let mut z = zi.to_vec();
    let mut out = Vec::with_capacity(x.len());
    for &xi in x {
        let y = b[0] * xi + z.first().copied().unwrap_or(0.0);
        for k in 0..n.saturating_sub(2) {
            z[k] = b[k + 1] * xi + z[k + 1] - a[k + 1] * y;
        }
        if n > 1 {
            z[n - 2] = b[n - 1] * xi - a[n - 1] * y;
        }
        out.push(y);
    }
    out
}

/// Filter state for the steady-state response to a unit step.
fn lfilter_zi(tf: &TransferFunction) -> Vec<f64> {
    let (b, a) = (&tf.b, &tf.a);
    let y_ss = b.iter().sum::<f64>() / a.iter().sum::<f64>();
    let n = b.len();
    let mut zi = vec![0.0; n.saturating_sub(1)];
    let mut acc = 0.0;
    for k in (0..zi.len()).rev() {
        acc += b[k + 1] - a[k + 1] * y_ss;
        zi[k] = acc;
    }
    zi
}

/// Forward-backward filtering with odd extension at both ends.
pub fn filtfilt(tf: &TransferFunction, x: &[f64]) -> Result<Vec<f64>> {
    let padlen = tf.padlen();
    if x.len() <= padlen {
        return Err(AnalysisError::SeriesTooShort {
            len: x.len(),
            padlen,
        });
    }
    let last = x.len() - 1;
    let mut ext = Vec::with_capacity(x.len() + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * x[0] - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=padlen).map(|i| 2.0 * x[last] - x[last - i]));

    let zi = lfilter_zi(tf);
    let scaled = |s: f64| zi.iter().map(|z| z * s).collect::<Vec<_>>();

    let mut y = lfilter(tf, &ext, &scaled(ext[0]));
    y.reverse();
    let mut y = lfilter(tf, &y, &scaled(y[0]));
    y.reverse();
    Ok(y[padlen..y.len() - padlen].to_vec())
}

/// Apply a filter configuration to a whole series.
///
/// `FilterKind::None` returns an exact copy of the input.
pub fn condition(ts: &TimeSeries, filter: &FilterConfig) -> Result<TimeSeries> {
    filter.validate(ts.fs)?;
    let response = match filter.kind {
        FilterKind::None => return Ok(ts.clone()),
        FilterKind::LowPass => Response::LowPass,
        FilterKind::HighPass => Response::HighPass,
    };
    let cutoff = filter.cutoff_hz.ok_or(AnalysisError::MissingCutoff {
        kind: filter.kind.name(),
    })?;
    let wn = cutoff / (ts.fs / 2.0);
    let tf = butter(BUTTERWORTH_ORDER, wn, response);
    debug!("{} at {cutoff} Hz (wn = {wn:.5}): b = {:?}, a = {:?}", filter.kind.name(), tf.b, tf.a);
    Ok(TimeSeries::new(ts.fs, filtfilt(&tf, &ts.data)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(diff <= tol, "expected {expected}, got {actual} (diff {diff} > tol {tol})");
    }

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn second_order_half_band_matches_reference() {
        let tf = butter(2, 0.5, Response::LowPass);
        let b = [0.29289321881345254, 0.5857864376269051, 0.29289321881345254];
        let a = [1.0, 0.0, 0.17157287525380988];
        for (x, y) in tf.b.iter().zip(b) {
            assert_close(*x, y, 1e-12);
        }
        for (x, y) in tf.a.iter().zip(a) {
            assert_close(*x, y, 1e-12);
        }
    }

    #[test]
    fn lowpass_has_unit_dc_gain_and_half_power_at_cutoff() {
        let tf = butter(4, 30.0 / 125.0, Response::LowPass);
        assert_eq!(tf.b.len(), 5);
        assert_eq!(tf.a[0], 1.0);
        assert_close(tf.gain_at(0.0), 1.0, 1e-9);
        assert_close(tf.gain_at(0.24), std::f64::consts::FRAC_1_SQRT_2, 1e-9);
        assert!(tf.gain_at(0.99) < 1e-3);
        // binomial numerator
        let ratio: Vec<f64> = tf.b.iter().map(|x| x / tf.b[0]).collect();
        for (x, y) in ratio.iter().zip([1.0, 4.0, 6.0, 4.0, 1.0]) {
            assert_close(*x, y, 1e-9);
        }
    }

    #[test]
    fn highpass_blocks_dc_and_passes_nyquist() {
        let tf = butter(4, 0.5 / 125.0, Response::HighPass);
        assert_close(tf.gain_at(0.0), 0.0, 1e-6);
        assert_close(tf.gain_at(1.0), 1.0, 1e-9);
        assert_close(tf.gain_at(0.004), std::f64::consts::FRAC_1_SQRT_2, 1e-6);
    }

    #[test]
    fn none_filter_is_identity() {
        let ts = TimeSeries::new(250.0, vec![1.5, -2.0, f64::MAX, 0.0]);
        let out = condition(&ts, &FilterConfig::none()).expect("identity");
        assert_eq!(out.data, ts.data);
        assert_eq!(out.fs, ts.fs);
    }

    #[test]
    fn filtfilt_keeps_constant_level_through_lowpass() {
        let ts = TimeSeries::new(250.0, vec![100.0; 500]);
        let out = condition(&ts, &FilterConfig::low_pass(30.0)).expect("filter");
        assert_eq!(out.len(), 500);
        for v in out.data {
            assert_close(v, 100.0, 1e-6);
        }
    }

    #[test]
    fn filtfilt_removes_constant_level_through_highpass() {
        let ts = TimeSeries::new(250.0, vec![100.0; 500]);
        let out = condition(&ts, &FilterConfig::high_pass(0.5)).expect("filter");
        for v in out.data {
            assert_close(v, 0.0, 1e-4);
        }
    }

    #[test]
    fn lowpass_is_zero_phase_in_passband() {
        let x = sine(5.0, 250.0, 1000);
        let ts = TimeSeries::new(250.0, x.clone());
        let out = condition(&ts, &FilterConfig::low_pass(30.0)).expect("filter");
        for i in 200..800 {
            assert_close(out.data[i], x[i], 1e-3);
        }
    }

    #[test]
    fn lowpass_attenuates_stopband() {
        let ts = TimeSeries::new(250.0, sine(60.0, 250.0, 1000));
        let out = condition(&ts, &FilterConfig::low_pass(30.0)).expect("filter");
        let peak = out.data[200..800]
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        assert!(peak < 0.01, "stopband peak {peak}");
    }

    #[test]
    fn short_series_is_rejected() {
        let ts = TimeSeries::new(250.0, vec![0.0; 15]);
        let err = condition(&ts, &FilterConfig::low_pass(30.0)).unwrap_err();
        assert_eq!(err, AnalysisError::SeriesTooShort { len: 15, padlen: 15 });
    }

    #[test]
    fn invalid_cutoff_is_rejected_before_filtering() {
        let ts = TimeSeries::new(250.0, vec![0.0; 100]);
        let err = condition(&ts, &FilterConfig::low_pass(200.0)).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidCutoff { .. }));
    }
}
