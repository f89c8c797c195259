//! Error types shared by the survey pipelines.

use thiserror::Error;

use crate::tiers::PriceTier;

/// Problems resolving the survey columns a pipeline depends on.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A price tier matched no demand columns in the header.
    #[error("price tier '{tier}' matched no columns with prefix '{prefix}'")]
    EmptyTier { tier: PriceTier, prefix: String },
    /// A required column is absent from the header.
    #[error("column '{0}' not found in survey header")]
    MissingColumn(String),
    /// The dataset carries none of the `avg_demand_<tier>` columns.
    #[error("no average demand columns found; run the aggregate step first")]
    NoDemandColumns,
}

/// Reasons a linear fit cannot be determined.
#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    #[error("need at least 2 samples to fit a line, got {0}")]
    InsufficientSamples(usize),
    #[error("all {0} samples share the same quantity; slope is undefined")]
    DegenerateQuantities(usize),
}

/// Reasons a consumer-surplus estimate is not meaningful.
#[derive(Debug, Error, PartialEq)]
pub enum SurplusError {
    #[error(transparent)]
    Fit(#[from] FitError),
    /// The fitted price does not fall as demand rises.
    #[error("demand curve slope {slope} is not negative; surplus is undefined")]
    NonDownwardSlope { slope: f64 },
    /// Riders would have to be paid to take the first ride.
    #[error("demand curve price intercept {intercept} is not positive; surplus is undefined")]
    NonPositiveIntercept { intercept: f64 },
}

/// Top-level library error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
