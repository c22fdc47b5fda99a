//! Two-key deduplication of extracted records
//!
//! A record is kept only if neither its URL nor its normalized
//! (title, category) pair has been accepted before.
//!
//! Outcomes arrive in completion order, which varies from run to run. They
//! are stably sorted by work-list index before reduction, so the record kept
//! for a group of duplicates is always the one the catalog lists first.

use crate::crawler::coordinator::ExtractionOutcome;
use crate::crawler::errors::FailureKind;
use crate::model::BookRecord;
use std::collections::{BTreeMap, HashSet};

/// Output of one reduction
#[derive(Debug, Default)]
pub struct Reduction {
    /// Accepted records, in work-list order
    pub records: Vec<BookRecord>,

    /// Records rejected because their URL was already accepted
    pub duplicate_urls: u64,

    /// Records rejected because their title and category were already accepted
    pub duplicate_titles: u64,

    /// Failed outcomes per failure kind
    pub failures: BTreeMap<FailureKind, u64>,
}

impl Reduction {
    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }
}

/// Single-threaded reducer holding the two membership sets
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen_urls: HashSet<String>,
    seen_titles: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers one record and reports whether it was accepted
    ///
    /// Both keys are marked seen only on acceptance.
    pub fn accept(&mut self, record: &BookRecord) -> Acceptance {
        if self.seen_urls.contains(&record.url) {
            return Acceptance::DuplicateUrl;
        }

        let title_key = record.title_key();
        if self.seen_titles.contains(&title_key) {
            return Acceptance::DuplicateTitle;
        }

        self.seen_urls.insert(record.url.clone());
        self.seen_titles.insert(title_key);
        Acceptance::Accepted
    }

    /// Reduces a batch of extraction outcomes
    ///
    /// Failures are logged and counted; they never reach `records`.
    pub fn reduce(mut self, mut outcomes: Vec<ExtractionOutcome>) -> Reduction {
        outcomes.sort_by_key(|outcome| outcome.index);

        let mut reduction = Reduction::default();

        for outcome in outcomes {
            let record = match outcome.result {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", outcome.reference.detail_url, e);
                    *reduction.failures.entry(e.kind()).or_insert(0) += 1;
                    continue;
                }
            };

            match self.accept(&record) {
                Acceptance::Accepted => reduction.records.push(record),
                Acceptance::DuplicateUrl => {
                    tracing::debug!("Duplicate URL {} ({})", record.url, record.category);
                    reduction.duplicate_urls += 1;
                }
                Acceptance::DuplicateTitle => {
                    tracing::debug!(
                        "Duplicate title '{}' in {} ({})",
                        record.title,
                        record.category,
                        record.url
                    );
                    reduction.duplicate_titles += 1;
                }
            }
        }

        tracing::info!(
            "Dedup kept {} records ({} duplicate URLs, {} duplicate titles, {} failures)",
            reduction.records.len(),
            reduction.duplicate_urls,
            reduction.duplicate_titles,
            reduction.total_failures()
        );

        reduction
    }
}

/// Verdict for one offered record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Accepted,
    DuplicateUrl,
    DuplicateTitle,
}

/// Reduces outcomes with a fresh [`Deduplicator`]
pub fn dedup_records(outcomes: Vec<ExtractionOutcome>) -> Reduction {
    Deduplicator::new().reduce(outcomes)
}
