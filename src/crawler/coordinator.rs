//! Concurrent extraction coordinator
//!
//! Detail pages are fetched and parsed by a pool of tokio tasks. The pool
//! width is enforced with a semaphore: a permit is acquired before each task
//! is spawned and released when it finishes. Finished tasks are reaped from a
//! `JoinSet` in completion order.
//!
//! The coordinator is a barrier. `extract_all` returns once every work item
//! has an outcome, and always returns exactly one outcome per item.

use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT_MS};
use crate::crawler::errors::ExtractError;
use crate::crawler::fetcher::{fetch_with_timeout, PageFetcher};
use crate::crawler::parser::FieldExtractor;
use crate::model::{BookRecord, DetailReference};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Number of completions between progress log lines
const PROGRESS_INTERVAL: usize = 50;

/// Tuning for one extraction batch
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum number of detail pages in flight
    pub concurrency: usize,

    /// Per-fetch timeout
    pub fetch_timeout: Duration,

    /// Stops dispatching new work when cancelled
    pub cancel: CancellationToken,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY as usize,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            cancel: CancellationToken::new(),
        }
    }
}

/// What happened to one work item
#[derive(Debug)]
pub struct ExtractionOutcome {
    /// Position of the item in the submitted work list
    pub index: usize,

    /// The item itself
    pub reference: DetailReference,

    /// The extracted record, or why there is none
    pub result: Result<BookRecord, ExtractError>,
}

impl ExtractionOutcome {
    fn failed(index: usize, reference: DetailReference, error: ExtractError) -> Self {
        Self {
            index,
            reference,
            result: Err(error),
        }
    }
}

/// Fetches and extracts one detail page
pub async fn extract_one(
    fetcher: &dyn PageFetcher,
    extractor: FieldExtractor,
    reference: &DetailReference,
    timeout: Duration,
) -> Result<BookRecord, ExtractError> {
    let page = fetch_with_timeout(fetcher, &reference.detail_url, timeout).await?;
    let fields = extractor.extract_detail(&page.body, &page.url)?;
    Ok(BookRecord::from_fields(reference, fields))
}

/// Extracts every work item under a bounded concurrency limit
///
/// # Arguments
///
/// * `fetcher` - Shared page source
/// * `extractor` - Detail-page extractor (carries the required-field policy)
/// * `work` - Items to extract; their positions become `ExtractionOutcome::index`
/// * `options` - Pool width, timeout and cancellation
///
/// # Returns
///
/// One outcome per work item, in completion order. Items left undispatched
/// by a cancellation come back as [`ExtractError::Cancelled`]; items whose
/// task panicked come back as [`ExtractError::Worker`].
pub async fn extract_all(
    fetcher: Arc<dyn PageFetcher>,
    extractor: FieldExtractor,
    work: Vec<DetailReference>,
    options: &ExtractOptions,
) -> Vec<ExtractionOutcome> {
    let total = work.len();
    let width = options.concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(width));
    let mut tasks: JoinSet<ExtractionOutcome> = JoinSet::new();
    let mut pending: BTreeMap<usize, DetailReference> = BTreeMap::new();
    let mut outcomes = Vec::with_capacity(total);
    let start_time = Instant::now();

    tracing::info!("Extracting {} detail pages with {} workers", total, width);

    for (index, reference) in work.into_iter().enumerate() {
        let permit = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => None,
            permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
        };

        let Some(permit) = permit else {
            let error = ExtractError::Cancelled {
                url: reference.detail_url.to_string(),
            };
            outcomes.push(ExtractionOutcome::failed(index, reference, error));
            continue;
        };

        pending.insert(index, reference.clone());
        let fetcher = Arc::clone(&fetcher);
        let timeout = options.fetch_timeout;

        tasks.spawn(async move {
            let _permit = permit;
            let result = extract_one(fetcher.as_ref(), extractor, &reference, timeout).await;
            ExtractionOutcome {
                index,
                reference,
                result,
            }
        });
    }

    if options.cancel.is_cancelled() {
        tracing::warn!(
            "Extraction cancelled; draining {} in-flight items",
            tasks.len()
        );
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => {
                pending.remove(&outcome.index);
                if let Err(e) = &outcome.result {
                    tracing::debug!("Extraction failed for {}: {}", outcome.reference.detail_url, e);
                }
                outcomes.push(outcome);

                if outcomes.len() % PROGRESS_INTERVAL == 0 {
                    let rate = outcomes.len() as f64 / start_time.elapsed().as_secs_f64();
                    tracing::info!(
                        "Progress: {}/{} detail pages, {:.2} pages/sec",
                        outcomes.len(),
                        total,
                        rate
                    );
                }
            }
            Err(e) => {
                tracing::error!("Extraction task failed: {}", e);
            }
        }
    }

    // Tasks that panicked never produced an outcome
    for (index, reference) in pending {
        let error = ExtractError::Worker {
            url: reference.detail_url.to_string(),
            message: "task did not complete".to_string(),
        };
        outcomes.push(ExtractionOutcome::failed(index, reference, error));
    }

    tracing::info!(
        "Extraction finished: {} outcomes in {:?}",
        outcomes.len(),
        start_time.elapsed()
    );

    outcomes
}
