//! Harvest orchestration
//!
//! Drives one run from the catalog root to the CSV file:
//!
//! 1. Enumerate categories (a failure here aborts the run)
//! 2. Walk each category's listing, one category at a time
//! 3. Extract every detail page on a bounded pool
//! 4. Deduplicate the batch
//! 5. Download cover images
//! 6. Write the CSV and the optional markdown summary

use crate::config::Config;
use crate::crawler::coordinator::{extract_all, ExtractOptions};
use crate::crawler::dedup::{dedup_records, Reduction};
use crate::crawler::enumerator::enumerate_categories;
use crate::crawler::errors::FailureKind;
use crate::crawler::fetcher::{build_http_client, HttpFetcher, PageFetcher};
use crate::crawler::parser::{FieldExtractor, RequiredFields};
use crate::crawler::walker::walk_category;
use crate::model::{DetailReference, ExportedRecord};
use crate::output::{write_csv, write_markdown_report, HarvestReport, ImageDownloader};
use crate::url::catalog_base;
use crate::HarvestError;
use chrono::Utc;
use reqwest::Client;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything gathered before export
#[derive(Debug, Default)]
pub struct CollectedRecords {
    pub categories: usize,
    pub pages_walked: usize,
    pub references: usize,

    /// Deduplicated records plus extraction failure counts
    pub reduction: Reduction,

    /// Walks that stopped early, per failure kind
    pub walk_failures: BTreeMap<FailureKind, u64>,

    pub cancelled: bool,
}

impl CollectedRecords {
    /// Work items that produced a record, before deduplication
    pub fn extracted(&self) -> usize {
        self.references
            .saturating_sub(self.reduction.total_failures() as usize)
    }

    /// Walk and extraction failures merged per kind
    pub fn skipped(&self) -> BTreeMap<FailureKind, u64> {
        let mut skipped = self.walk_failures.clone();
        for (kind, count) in &self.reduction.failures {
            *skipped.entry(*kind).or_insert(0) += count;
        }
        skipped
    }
}

/// Main harvest structure
pub struct Harvester {
    config: Config,
    fetcher: Arc<dyn PageFetcher>,
    client: Client,
    extractor: FieldExtractor,
    root_url: Url,
    catalog_base: Url,
    config_hash: Option<String>,
}

impl Harvester {
    /// Creates a harvester fetching over HTTP
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - Invalid root URL or HTTP client failure
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let fetcher = HttpFetcher::from_config(&config.user_agent, config.crawler.fetch_timeout())?;
        let client = fetcher.client().clone();
        Self::build(config, Arc::new(fetcher), client)
    }

    /// Creates a harvester reading pages from `fetcher`
    ///
    /// Cover images are still downloaded over HTTP.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.user_agent, config.crawler.fetch_timeout())?;
        Self::build(config, fetcher, client)
    }

    fn build(config: Config, fetcher: Arc<dyn PageFetcher>, client: Client) -> Result<Self, HarvestError> {
        let root_url = Url::parse(&config.crawler.root_url)?;
        let catalog_base = catalog_base(&root_url)?;
        let extractor =
            FieldExtractor::new(RequiredFields::from_strict(config.crawler.strict_required_fields));

        Ok(Self {
            config,
            fetcher,
            client,
            extractor,
            root_url,
            catalog_base,
            config_hash: None,
        })
    }

    /// Records the configuration hash in the run report
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Runs enumeration, pagination, extraction and deduplication
    ///
    /// Only a failure to enumerate categories is returned as an error. Walk
    /// and extraction failures are counted in the result.
    pub async fn collect_records(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CollectedRecords, HarvestError> {
        let timeout = self.config.crawler.fetch_timeout();

        let categories = enumerate_categories(self.fetcher.as_ref(), &self.root_url, timeout)
            .await
            .map_err(|e| {
                tracing::error!("Cannot enumerate categories on {}: {}", self.root_url, e);
                HarvestError::Enumeration(e)
            })?;

        let mut collected = CollectedRecords {
            categories: categories.len(),
            ..CollectedRecords::default()
        };
        let mut work = Vec::new();

        for category in &categories {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = walk_category(
                self.fetcher.as_ref(),
                &self.catalog_base,
                &category.listing_url,
                timeout,
                cancel,
            )
            .await;

            if let Some(e) = &outcome.error {
                tracing::warn!(
                    "Walk of '{}' stopped early after {} items: {}",
                    category.name,
                    outcome.detail_urls.len(),
                    e
                );
                *collected.walk_failures.entry(e.kind()).or_insert(0) += 1;
            } else {
                tracing::info!(
                    "Category '{}': {} items on {} pages",
                    category.name,
                    outcome.detail_urls.len(),
                    outcome.pages_visited
                );
            }

            collected.pages_walked += outcome.pages_visited;
            work.extend(
                outcome
                    .detail_urls
                    .into_iter()
                    .map(|url| DetailReference::new(url, category.name.clone())),
            );
        }

        collected.references = work.len();

        let options = ExtractOptions {
            concurrency: self.config.crawler.concurrency as usize,
            fetch_timeout: timeout,
            cancel: cancel.clone(),
        };
        let outcomes = extract_all(Arc::clone(&self.fetcher), self.extractor, work, &options).await;

        collected.reduction = dedup_records(outcomes);
        collected.cancelled = cancel.is_cancelled();

        Ok(collected)
    }

    /// Runs a complete harvest and writes its outputs
    pub async fn run(&self, cancel: CancellationToken) -> Result<HarvestReport, HarvestError> {
        let started_at = Utc::now();
        tracing::info!("Starting harvest of {}", self.root_url);

        let collected = self.collect_records(&cancel).await?;
        let skipped = collected.skipped();
        let extracted = collected.extracted();

        let mut exported: Vec<ExportedRecord> = collected
            .reduction
            .records
            .iter()
            .cloned()
            .map(ExportedRecord::from)
            .collect();

        let (images_downloaded, images_failed) = if self.config.output.download_images {
            self.download_images(&mut exported).await
        } else {
            (0, 0)
        };

        let csv_path = PathBuf::from(&self.config.output.csv_path);
        write_csv(&csv_path, &exported)?;

        let report = HarvestReport {
            started_at,
            finished_at: Utc::now(),
            root_url: self.root_url.to_string(),
            config_hash: self.config_hash.clone(),
            categories: collected.categories,
            pages_walked: collected.pages_walked,
            references: collected.references,
            extracted,
            records: exported.len(),
            duplicate_urls: collected.reduction.duplicate_urls,
            duplicate_titles: collected.reduction.duplicate_titles,
            skipped,
            images_downloaded,
            images_failed,
            cancelled: collected.cancelled,
            csv_path,
        };

        if let Some(summary_path) = &self.config.output.summary_path {
            write_markdown_report(&report, Path::new(summary_path))?;
            tracing::info!("Summary written to {}", summary_path);
        }

        tracing::info!(
            "Harvest completed: {} records, {} skipped, in {}s",
            report.records,
            report.total_skipped(),
            report.duration_seconds()
        );

        Ok(report)
    }

    /// Downloads each record's cover image, filling `local_image_path`
    ///
    /// Returns the number of images stored and the number that failed.
    async fn download_images(&self, records: &mut [ExportedRecord]) -> (usize, usize) {
        let mut downloader = ImageDownloader::new(self.client.clone());
        let folder = Path::new(&self.config.output.image_dir);
        let mut stored = 0;
        let mut failed = 0;

        for exported in records.iter_mut() {
            if exported.record.image_url.is_empty() {
                continue;
            }

            match downloader.download_record(&exported.record, folder).await {
                Ok(path) => {
                    exported.local_image_path = Some(path);
                    stored += 1;
                }
                Err(e) => {
                    tracing::warn!("Image download failed for '{}': {}", exported.record.title, e);
                    failed += 1;
                }
            }
        }

        tracing::info!("Images: {} stored, {} failed", stored, failed);
        (stored, failed)
    }
}

/// Runs a complete harvest over HTTP without external cancellation
///
/// # Example
///
/// ```no_run
/// use shelf_harvest::config::Config;
/// use shelf_harvest::crawler::run_harvest;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_harvest(Config::default()).await?;
/// println!("{} records", report.records);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: Config) -> Result<HarvestReport, HarvestError> {
    Harvester::new(config)?.run(CancellationToken::new()).await
}
