//! Pagination walker
//!
//! Follows a category's "next" cursors one page at a time with an explicit
//! loop. Every visited page URL is remembered, so a cursor that points back to
//! an earlier page ends the walk with a cycle error instead of looping.

use crate::crawler::errors::ExtractError;
use crate::crawler::fetcher::{fetch_with_timeout, PageFetcher};
use crate::crawler::parser::parse_listing;
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of walking one category
///
/// `detail_urls` holds everything gathered before the walk stopped. When
/// `error` is set the list is partial.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Distinct detail page URLs, in discovery order
    pub detail_urls: Vec<Url>,

    /// Number of listing pages fetched and parsed
    pub pages_visited: usize,

    /// Why the walk stopped early, if it did
    pub error: Option<ExtractError>,
}

impl WalkOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

fn page_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.to_string()
}

/// Walks a category listing from its first page to its last
///
/// # Arguments
///
/// * `fetcher` - Source of listing pages
/// * `catalog_base` - Base that item anchors resolve against
/// * `listing_url` - First page of the category
/// * `timeout` - Per-page fetch timeout
/// * `cancel` - Checked before every page fetch
///
/// # Returns
///
/// A [`WalkOutcome`] with every item URL found. A fetch or parse failure,
/// a cursor cycle or a cancellation stops the walk and is reported in
/// `error`; URLs from earlier pages are kept.
pub async fn walk_category(
    fetcher: &dyn PageFetcher,
    catalog_base: &Url,
    listing_url: &Url,
    timeout: Duration,
    cancel: &CancellationToken,
) -> WalkOutcome {
    let mut outcome = WalkOutcome::default();
    let mut visited_pages: HashSet<String> = HashSet::new();
    let mut seen_items: HashSet<String> = HashSet::new();
    let mut cursor = Some(listing_url.clone());

    while let Some(page_url) = cursor.take() {
        if cancel.is_cancelled() {
            outcome.error = Some(ExtractError::Cancelled {
                url: page_url.to_string(),
            });
            break;
        }

        if !visited_pages.insert(page_key(&page_url)) {
            tracing::warn!("Pagination cycle: {} was already visited", page_url);
            outcome.error = Some(ExtractError::Cycle {
                url: page_url.to_string(),
            });
            break;
        }

        let page = match fetch_with_timeout(fetcher, &page_url, timeout).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch listing page {}: {}", page_url, e);
                outcome.error = Some(e.into());
                break;
            }
        };

        // Redirects land on a different URL; remember it as visited too
        visited_pages.insert(page_key(&page.url));

        let listing = match parse_listing(&page.body, &page.url, catalog_base) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!("Failed to parse listing page {}: {}", page_url, e);
                outcome.error = Some(e);
                break;
            }
        };

        outcome.pages_visited += 1;
        tracing::debug!(
            "Listing page {} yielded {} items (next: {})",
            page_url,
            listing.item_urls.len(),
            listing.next_page.is_some()
        );

        for item in listing.item_urls {
            if seen_items.insert(item.to_string()) {
                outcome.detail_urls.push(item);
            }
        }

        cursor = listing.next_page;
    }

    outcome
}
