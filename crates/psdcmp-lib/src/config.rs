use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AnalysisError;

/// Which Butterworth response to apply before splitting, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    None,
    LowPass,
    HighPass,
}

impl FilterKind {
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::LowPass => "low-pass",
            FilterKind::HighPass => "high-pass",
        }
    }
}

/// One named filter configuration; rows produced under it carry `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub kind: FilterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_hz: Option<f64>,
    pub label: String,
}

impl FilterConfig {
    pub fn none() -> Self {
        Self {
            kind: FilterKind::None,
            cutoff_hz: None,
            label: "No Filter".into(),
        }
    }

    pub fn low_pass(cutoff_hz: f64) -> Self {
        Self {
            kind: FilterKind::LowPass,
            cutoff_hz: Some(cutoff_hz),
            label: "Low-Pass Filter".into(),
        }
    }

    pub fn high_pass(cutoff_hz: f64) -> Self {
        Self {
            kind: FilterKind::HighPass,
            cutoff_hz: Some(cutoff_hz),
            label: "High-Pass Filter".into(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Check the cutoff against Nyquist for sampling rate `fs`.
    pub fn validate(&self, fs: f64) -> Result<(), AnalysisError> {
        if self.kind == FilterKind::None {
            return Ok(());
        }
        let cutoff_hz = self.cutoff_hz.ok_or(AnalysisError::MissingCutoff {
            kind: self.kind.name(),
        })?;
        let nyquist_hz = fs / 2.0;
        if !(cutoff_hz > 0.0 && cutoff_hz < nyquist_hz) {
            return Err(AnalysisError::InvalidCutoff {
                cutoff_hz,
                nyquist_hz,
            });
        }
        Ok(())
    }
}

/// Closed frequency interval `[lo_hz, hi_hz]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub lo_hz: f64,
    pub hi_hz: f64,
}

impl FrequencyBand {
    pub const fn new(lo_hz: f64, hi_hz: f64) -> Self {
        Self { lo_hz, hi_hz }
    }

    /// Main analysis band.
    pub const fn analysis() -> Self {
        Self::new(0.0, 30.0)
    }

    /// Alpha rhythm, the band that separates eyes-closed from eyes-open.
    pub const fn alpha() -> Self {
        Self::new(8.0, 12.0)
    }

    pub fn contains(&self, freq: f64) -> bool {
        freq >= self.lo_hz && freq <= self.hi_hz
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.lo_hz.is_nan() || self.hi_hz.is_nan() || self.lo_hz > self.hi_hz {
            return Err(AnalysisError::InvalidBand {
                lo: self.lo_hz,
                hi: self.hi_hz,
            });
        }
        Ok(())
    }
}

impl Default for FrequencyBand {
    fn default() -> Self {
        Self::analysis()
    }
}

/// Everything a comparison run needs; no paths or state live elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sampling_rate_hz: f64,
    /// Zero-based column positions averaged into one series.
    pub channels: Vec<usize>,
    /// Multiplier applied after averaging (e.g. counts to microvolts).
    pub scale: f64,
    /// Whether the first line of each capture is a header row.
    pub has_header: bool,
    pub subject_a: String,
    pub subject_b: String,
    pub band: FrequencyBand,
    pub filters: Vec<FilterConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 250.0,
            channels: vec![2, 3, 4, 5],
            scale: 1.0,
            has_header: false,
            subject_a: "Subject A".into(),
            subject_b: "Subject B".into(),
            band: FrequencyBand::analysis(),
            filters: vec![
                FilterConfig::none(),
                FilterConfig::low_pass(30.0),
                FilterConfig::high_pass(0.5),
            ],
        }
    }
}

impl AnalysisConfig {
    /// Reject configurations that would otherwise fail midway through a run.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let fs = self.sampling_rate_hz;
        if !(fs > 0.0 && fs.is_finite()) {
            return Err(AnalysisError::InvalidSamplingRate(fs));
        }
        if self.channels.is_empty() {
            return Err(AnalysisError::EmptyChannelSelection);
        }
        self.band.validate()?;
        for filter in &self.filters {
            filter.validate(fs)?;
        }
        Ok(())
    }
}

/// Read an [`AnalysisConfig`] from TOML; missing keys fall back to defaults.
pub fn read_config(path: &Path) -> Result<AnalysisConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let config: AnalysisConfig =
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating config {}", path.display()))?;
    Ok(config)
}

/// Render a configuration as TOML.
pub fn to_toml(config: &AnalysisConfig) -> Result<String> {
    toml::to_string_pretty(config).context("serializing config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AnalysisConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.filters.len(), 3);
        assert_eq!(config.channels, vec![2, 3, 4, 5]);
    }

    #[test]
    fn rejects_cutoff_at_nyquist() {
        let err = FilterConfig::low_pass(125.0).validate(250.0).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidCutoff { .. }));
        let err = FilterConfig::high_pass(0.0).validate(250.0).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidCutoff { .. }));
    }

    #[test]
    fn rejects_missing_cutoff() {
        let filter = FilterConfig {
            kind: FilterKind::HighPass,
            cutoff_hz: None,
            label: "hp".into(),
        };
        assert_eq!(
            filter.validate(250.0),
            Err(AnalysisError::MissingCutoff { kind: "high-pass" })
        );
    }

    #[test]
    fn rejects_empty_channels_and_bad_band() {
        let mut config = AnalysisConfig::default();
        config.channels.clear();
        assert_eq!(config.validate(), Err(AnalysisError::EmptyChannelSelection));

        let mut config = AnalysisConfig::default();
        config.band = FrequencyBand::new(12.0, 8.0);
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidBand { .. })
        ));
    }

    #[test]
    fn band_is_closed_interval() {
        let band = FrequencyBand::alpha();
        assert!(band.contains(8.0));
        assert!(band.contains(12.0));
        assert!(!band.contains(12.5));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AnalysisConfig = toml::from_str(
            r#"
sampling_rate_hz = 500.0
subject_a = "Joe"

[[filters]]
kind = "high-pass"
cutoff_hz = 1.0
label = "HP 1 Hz"
"#,
        )
        .expect("parse toml");
        assert_eq!(config.sampling_rate_hz, 500.0);
        assert_eq!(config.subject_a, "Joe");
        assert_eq!(config.subject_b, "Subject B");
        assert_eq!(config.channels, vec![2, 3, 4, 5]);
        assert_eq!(config.filters, vec![FilterConfig::high_pass(1.0).with_label("HP 1 Hz")]);
    }

    #[test]
    fn default_config_survives_toml() {
        let text = to_toml(&AnalysisConfig::default()).expect("to toml");
        let back: AnalysisConfig = toml::from_str(&text).expect("from toml");
        assert_eq!(back, AnalysisConfig::default());
    }
}
