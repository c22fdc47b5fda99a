//! HTML parsing for the three catalog page shapes
//!
//! - the site root, carrying the category navigation
//! - listing pages, carrying item anchors and an optional "next" cursor
//! - detail pages, carrying the fields of one record
//!
//! Numeric fields are parsed leniently: malformed text degrades to zero
//! instead of failing the record.

use crate::crawler::errors::ExtractError;
use crate::model::{Category, DetailFields};
use crate::url::{directory_of, resolve_href, resolve_item_href};
use scraper::{ElementRef, Html, Selector};
use url::Url;

const CATEGORY_NAV: &str = "div.side_categories";
const CATEGORY_LINKS: &str = "div.side_categories ul li ul li a[href]";
const ITEM_ANCHORS: &str = "h3 a[href]";
const NEXT_CURSOR: &str = "li.next a";

const RATING_WORDS: [&str; 5] = ["one", "two", "three", "four", "five"];

/// Which detail fields must be present for a record to be kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequiredFields {
    /// Only the title is required; everything else degrades to a default
    #[default]
    TitleOnly,
    /// Title, price and availability are all required
    Strict,
}

impl RequiredFields {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::TitleOnly
        }
    }
}

/// One parsed listing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    /// Detail page URLs, in document order
    pub item_urls: Vec<Url>,

    /// Next listing page, if the page has a cursor
    pub next_page: Option<Url>,
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

/// Extracts the category list from the site root
///
/// Category hrefs are resolved against the directory of `root_url`, the same
/// base the catalog path hangs off. Fails with a parse error when the
/// navigation block is missing entirely.
pub fn parse_categories(html: &str, root_url: &Url) -> Result<Vec<Category>, ExtractError> {
    let document = Html::parse_document(html);

    let nav = selector(CATEGORY_NAV)
        .ok_or_else(|| ExtractError::parse(root_url.as_str(), "invalid navigation selector"))?;
    if document.select(&nav).next().is_none() {
        return Err(ExtractError::parse(
            root_url.as_str(),
            "category navigation block not found",
        ));
    }

    let links = selector(CATEGORY_LINKS)
        .ok_or_else(|| ExtractError::parse(root_url.as_str(), "invalid category selector"))?;

    let base = directory_of(root_url);
    let mut categories = Vec::new();
    for element in document.select(&links) {
        let name = element_text(element);
        let href = element.value().attr("href").unwrap_or_default();

        match resolve_href(&base, href) {
            Some(listing_url) if !name.is_empty() => {
                categories.push(Category { name, listing_url });
            }
            _ => {
                tracing::debug!("Skipping unusable category link '{}' ({})", name, href);
            }
        }
    }

    Ok(categories)
}

/// Extracts item anchors and the "next" cursor from a listing page
///
/// Item hrefs resolve against `catalog_base`; the cursor resolves against
/// `page_url`. A cursor element without a usable href is a parse error, since
/// silently ending the walk there would truncate the category.
pub fn parse_listing(
    html: &str,
    page_url: &Url,
    catalog_base: &Url,
) -> Result<ListingPage, ExtractError> {
    let document = Html::parse_document(html);

    let mut listing = ListingPage::default();

    if let Some(items) = selector(ITEM_ANCHORS) {
        for element in document.select(&items) {
            if let Some(href) = element.value().attr("href") {
                match resolve_item_href(catalog_base, href) {
                    Some(url) => listing.item_urls.push(url),
                    None => tracing::debug!("Skipping unusable item href {} on {}", href, page_url),
                }
            }
        }
    }

    if let Some(next) = selector(NEXT_CURSOR) {
        if let Some(element) = document.select(&next).next() {
            let href = element.value().attr("href").unwrap_or_default();
            let next_page = resolve_href(page_url, href).ok_or_else(|| {
                ExtractError::parse(
                    page_url.as_str(),
                    format!("unusable next cursor href '{}'", href),
                )
            })?;
            listing.next_page = Some(next_page);
        }
    }

    Ok(listing)
}

/// Detail-page extractor with a configurable required-field policy
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldExtractor {
    policy: RequiredFields,
}

impl FieldExtractor {
    pub fn new(policy: RequiredFields) -> Self {
        Self { policy }
    }

    /// Parses one detail page
    ///
    /// # Arguments
    ///
    /// * `html` - The detail page HTML
    /// * `page_url` - URL the page was fetched from, used to resolve the image
    ///
    /// # Returns
    ///
    /// * `Ok(DetailFields)` - Every field, defaulted where absent
    /// * `Err(ExtractError::MissingField)` - A field required by the policy is absent
    pub fn extract_detail(&self, html: &str, page_url: &Url) -> Result<DetailFields, ExtractError> {
        let document = Html::parse_document(html);
        let missing = |field: &'static str| ExtractError::MissingField {
            url: page_url.to_string(),
            field,
        };

        let title = first_text(&document, "div.product_main h1")
            .or_else(|| first_text(&document, "h1"))
            .ok_or_else(|| missing("title"))?;

        let info = product_information(&document);
        let info_value = |key: &str| {
            info.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.clone())
        };

        let price_incl_text = info_value("Price (incl. tax)")
            .or_else(|| first_text(&document, "div.product_main p.price_color"))
            .or_else(|| first_text(&document, "p.price_color"));
        let price_excl_text = info_value("Price (excl. tax)").or_else(|| price_incl_text.clone());

        let availability_text = first_text(&document, "p.instock.availability")
            .or_else(|| first_text(&document, "p.availability"))
            .or_else(|| info_value("Availability"));

        if self.policy == RequiredFields::Strict {
            if price_incl_text.is_none() {
                return Err(missing("price"));
            }
            if availability_text.is_none() {
                return Err(missing("availability"));
            }
        }

        let description = first_text(&document, "#product_description ~ p").unwrap_or_default();

        Ok(DetailFields {
            external_id: info_value("UPC").unwrap_or_default(),
            title,
            price_including_tax: price_incl_text.as_deref().map(parse_price).unwrap_or(0.0),
            price_excluding_tax: price_excl_text.as_deref().map(parse_price).unwrap_or(0.0),
            available_count: availability_text
                .as_deref()
                .map(parse_availability)
                .unwrap_or(0),
            description,
            rating: extract_rating(&document),
            image_url: extract_image_url(&document, page_url),
        })
    }
}

/// Reads the `th`/`td` pairs of the product information table
fn product_information(document: &Html) -> Vec<(String, String)> {
    let (Some(rows), Some(th), Some(td)) = (
        selector("table tr"),
        selector("th"),
        selector("td"),
    ) else {
        return Vec::new();
    };

    document
        .select(&rows)
        .filter_map(|row| {
            let key = row.select(&th).next().map(element_text)?;
            let value = row.select(&td).next().map(element_text)?;
            Some((key, value))
        })
        .collect()
}

fn extract_rating(document: &Html) -> u8 {
    let Some(sel) = selector("p.star-rating") else {
        return 0;
    };

    document
        .select(&sel)
        .next()
        .and_then(|element| {
            element
                .value()
                .classes()
                .map(parse_rating)
                .find(|rating| *rating > 0)
        })
        .unwrap_or(0)
}

fn extract_image_url(document: &Html, page_url: &Url) -> String {
    for css in [
        "div.item.active img",
        "#product_gallery img",
        "div.product_main img",
        "img",
    ] {
        let Some(sel) = selector(css) else {
            continue;
        };
        let src = document
            .select(&sel)
            .filter_map(|element| element.value().attr("src"))
            .find_map(|src| resolve_href(page_url, src));
        if let Some(url) = src {
            return url.to_string();
        }
    }
    String::new()
}

/// Parses a currency string, keeping only digits and the decimal point
///
/// # Examples
///
/// ```
/// use shelf_harvest::crawler::parse_price;
///
/// assert_eq!(parse_price("£51.77 "), 51.77);
/// assert_eq!(parse_price("free"), 0.0);
/// ```
pub fn parse_price(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

/// Returns the first run of digits in an availability text, or 0
///
/// # Examples
///
/// ```
/// use shelf_harvest::crawler::parse_availability;
///
/// assert_eq!(parse_availability("In stock (22 available)"), 22);
/// assert_eq!(parse_availability("Out of stock"), 0);
/// ```
pub fn parse_availability(text: &str) -> u32 {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Maps a rating word (`One`..`Five`) to 1..=5, anything else to 0
pub fn parse_rating(word: &str) -> u8 {
    let word = word.trim().to_lowercase();
    RATING_WORDS
        .iter()
        .position(|w| *w == word)
        .map(|i| (i + 1) as u8)
        .unwrap_or(0)
}
