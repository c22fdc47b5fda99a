//! Category enumeration from the catalog root

use crate::crawler::errors::ExtractError;
use crate::crawler::fetcher::{fetch_with_timeout, PageFetcher};
use crate::crawler::parser::parse_categories;
use crate::model::Category;
use std::time::Duration;
use url::Url;

/// Fetches the site root and lists its categories in document order
///
/// # Returns
///
/// * `Ok(Vec<Category>)` - Categories found (possibly none)
/// * `Err(ExtractError::Fetch)` - The root page could not be retrieved
/// * `Err(ExtractError::Parse)` - The root page has no category navigation
pub async fn enumerate_categories(
    fetcher: &dyn PageFetcher,
    root_url: &Url,
    timeout: Duration,
) -> Result<Vec<Category>, ExtractError> {
    let page = fetch_with_timeout(fetcher, root_url, timeout).await?;
    let categories = parse_categories(&page.body, &page.url)?;

    tracing::info!("Found {} categories on {}", categories.len(), root_url);
    Ok(categories)
}
