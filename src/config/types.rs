use serde::Deserialize;

/// Default catalog root
pub const DEFAULT_ROOT_URL: &str = "http://books.toscrape.com/";

/// Default width of the extraction pool
pub const DEFAULT_CONCURRENCY: u32 = 32;

/// Default per-fetch timeout in milliseconds
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Main configuration structure for Shelf-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Catalog root page listing the categories
    #[serde(rename = "root-url", default = "default_root_url")]
    pub root_url: String,

    /// Maximum number of detail pages fetched at once
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Upper bound on a single page fetch (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Drop records missing price or availability, not only title
    #[serde(rename = "strict-required-fields", default)]
    pub strict_required_fields: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            root_url: default_root_url(),
            concurrency: default_concurrency(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            strict_required_fields: false,
        }
    }
}

/// User agent identification configuration
///
/// Keys left out of a present `[user-agent]` section fall back to the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ShelfHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the CSV file receiving one row per record
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: String,

    /// Folder receiving downloaded cover images
    #[serde(rename = "image-dir", default = "default_image_dir")]
    pub image_dir: String,

    /// Whether cover images are downloaded at all
    #[serde(rename = "download-images", default = "default_true")]
    pub download_images: bool,

    /// Optional markdown run summary
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            image_dir: default_image_dir(),
            download_images: true,
            summary_path: None,
        }
    }
}

fn default_root_url() -> String {
    DEFAULT_ROOT_URL.to_string()
}

fn default_concurrency() -> u32 {
    DEFAULT_CONCURRENCY
}

fn default_fetch_timeout_ms() -> u64 {
    DEFAULT_FETCH_TIMEOUT_MS
}

fn default_csv_path() -> String {
    "books.csv".to_string()
}

fn default_image_dir() -> String {
    "images".to_string()
}

fn default_true() -> bool {
    true
}
