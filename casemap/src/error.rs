//! Error types.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CasemapError {
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
    #[error("Could not find the file at {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("Country '{0}' not found in the file.")]
    CountryNotFound(String),
    #[error("Metric column '{0}' not found or not numeric.")]
    MetricNotFound(String),
    #[error("No numeric metric columns available for selection.")]
    NoEligibleMetrics,
    #[error("Failed to fetch geometries from {location}: {reason}")]
    GeometryUnreachable { location: String, reason: String },
    #[error("Failed to parse date label: '{0}'")]
    InvalidDate(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Wrapped polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
}
