//! Data model shared by every stage of the harvest pipeline
//!
//! `Category` and `DetailReference` live only for the duration of one run;
//! `BookRecord` is what leaves the pipeline towards export.

use std::path::PathBuf;
use url::Url;

/// A catalog category discovered on the site root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Display name, trimmed
    pub name: String,

    /// First page of the category's paginated listing
    pub listing_url: Url,
}

/// One item anchor found while walking a category listing
///
/// The same detail URL may appear under several categories when the site
/// cross-lists an item; nothing is collapsed at this stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailReference {
    /// Absolute URL of the item detail page
    pub detail_url: Url,

    /// Name of the category whose listing linked to the item
    pub category: String,
}

impl DetailReference {
    pub fn new(detail_url: Url, category: impl Into<String>) -> Self {
        Self {
            detail_url,
            category: category.into(),
        }
    }
}

/// Fields the extractor reads from a detail page
///
/// This is a record minus everything that comes from context: the page URL
/// and the category that linked to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFields {
    pub external_id: String,
    pub title: String,
    pub price_including_tax: f64,
    pub price_excluding_tax: f64,
    pub available_count: u32,
    pub description: String,
    /// Star rating, 0 when unknown
    pub rating: u8,
    /// Absolute cover image URL, empty when the page has none
    pub image_url: String,
}

/// A fully extracted catalog record
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub url: String,
    pub external_id: String,
    pub title: String,
    pub price_including_tax: f64,
    pub price_excluding_tax: f64,
    pub available_count: u32,
    pub description: String,
    pub category: String,
    pub rating: u8,
    pub image_url: String,
}

impl BookRecord {
    /// Assembles a record from extracted fields and the reference that led to the page
    pub fn from_fields(reference: &DetailReference, fields: DetailFields) -> Self {
        Self {
            url: reference.detail_url.to_string(),
            external_id: fields.external_id,
            title: fields.title,
            price_including_tax: fields.price_including_tax,
            price_excluding_tax: fields.price_excluding_tax,
            available_count: fields.available_count,
            description: fields.description,
            category: reference.category.clone(),
            rating: fields.rating,
            image_url: fields.image_url,
        }
    }

    /// Content identity used by deduplication: normalized title and category
    pub fn title_key(&self) -> String {
        format!(
            "{}\u{0}{}",
            normalize_key(&self.title),
            normalize_key(&self.category)
        )
    }
}

/// Trims and lowercases a string for identity comparisons
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A record ready for tabular export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedRecord {
    pub record: BookRecord,

    /// Where the cover image was stored, if it was downloaded
    pub local_image_path: Option<PathBuf>,
}

impl From<BookRecord> for ExportedRecord {
    fn from(record: BookRecord) -> Self {
        Self {
            record,
            local_image_path: None,
        }
    }
}
