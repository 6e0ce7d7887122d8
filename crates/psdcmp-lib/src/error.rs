use thiserror::Error;

/// Contract violations caught before any numerical work starts.
///
/// Malformed sample values are not errors: they travel through the pipeline
/// as NaN.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("sampling rate must be positive, got {0}")]
    InvalidSamplingRate(f64),

    #[error("channel selection is empty")]
    EmptyChannelSelection,

    #[error("channel column {index} is out of range for a recording with {columns} columns")]
    ChannelOutOfRange { index: usize, columns: usize },

    #[error("cutoff {cutoff_hz} Hz must lie strictly between 0 and Nyquist ({nyquist_hz} Hz)")]
    InvalidCutoff { cutoff_hz: f64, nyquist_hz: f64 },

    #[error("{kind} filter requires a cutoff frequency")]
    MissingCutoff { kind: &'static str },

    #[error("series of {len} samples is too short for zero-phase filtering (needs more than {padlen})")]
    SeriesTooShort { len: usize, padlen: usize },

    #[error("frequency band [{lo}, {hi}] Hz is invalid")]
    InvalidBand { lo: f64, hi: f64 },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
