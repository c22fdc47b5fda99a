//! Output module for harvested records
//!
//! This module handles:
//! - Downloading cover images next to the export
//! - Writing the record set as CSV
//! - Reporting run statistics (stdout and markdown)

mod csv_export;
mod images;
pub mod report;

pub use csv_export::{write_csv, write_records, CSV_HEADERS};
pub use images::{sanitize_filename, ImageDownloader};
pub use report::{format_markdown_report, print_report, write_markdown_report, HarvestReport};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
