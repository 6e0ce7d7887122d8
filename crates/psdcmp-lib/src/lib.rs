pub mod aggregate;
pub mod config;
pub mod error;
pub mod filter;
pub mod io;
pub mod pipeline;
pub mod signal;
pub mod spectrum;
pub mod stats;
pub mod summary;

pub use config::{AnalysisConfig, FilterConfig, FilterKind, FrequencyBand};
pub use error::AnalysisError;
pub use pipeline::*;
pub use signal::*;
