//! Shelf-Harvest: a catalog harvester for paginated book sites
//!
//! This crate walks a hierarchical HTML catalog (categories, paginated listings,
//! item detail pages), extracts one structured record per item, deduplicates the
//! record set and hands it to CSV export and cover-image download.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod url;

use thiserror::Error;

pub use crawler::{ExtractError, FailureKind, FetchError};
pub use output::OutputError;

/// Main error type for Shelf-Harvest runs
///
/// Only failures that abort a whole run end up here. Page- and item-level
/// failures travel as [`ExtractError`] values and are counted in the report.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Category enumeration failed: {0}")]
    Enumeration(#[source] ExtractError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Shelf-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_harvest, Harvester};
pub use model::{BookRecord, Category, DetailReference};
