//! Crawler module for catalog traversal and record extraction
//!
//! This module contains the core harvesting logic, including:
//! - Page fetching behind the [`PageFetcher`] trait, with per-fetch timeouts
//! - HTML parsing of the root, listing and detail pages
//! - Category enumeration and cursor-following pagination
//! - Bounded-concurrency extraction and batch deduplication
//! - Overall run orchestration

mod coordinator;
mod dedup;
mod enumerator;
mod errors;
mod fetcher;
mod parser;
mod pipeline;
mod walker;

#[cfg(test)]
mod testing;

pub use coordinator::{extract_all, extract_one, ExtractOptions, ExtractionOutcome};
pub use dedup::{dedup_records, Acceptance, Deduplicator, Reduction};
pub use enumerator::enumerate_categories;
pub use errors::{ExtractError, FailureKind, FetchError};
pub use fetcher::{build_http_client, fetch_with_timeout, FetchedPage, HttpFetcher, PageFetcher};
pub use parser::{
    parse_availability, parse_categories, parse_listing, parse_price, parse_rating,
    FieldExtractor, ListingPage, RequiredFields,
};
pub use pipeline::{run_harvest, CollectedRecords, Harvester};
pub use walker::{walk_category, WalkOutcome};
