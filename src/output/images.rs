//! Cover image download
//!
//! Images are stored as `<sanitized title>.<ext>` in one folder. A file that
//! already exists is never fetched again, so re-running a harvest only pulls
//! new covers.
//!
//! Two records with the same title but different covers would share a file
//! name. Within one run the second one gets `<title> <UPC>.<ext>` instead.

use crate::model::BookRecord;
use crate::output::{OutputError, OutputResult};
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Longest file stem kept from a title, in characters
const MAX_STEM_CHARS: usize = 120;

const DEFAULT_EXTENSION: &str = "jpg";

/// Replaces every character outside alphanumerics, space, `.`, `_` and `-` with `_`
///
/// # Examples
///
/// ```
/// use shelf_harvest::output::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Sapiens: A Brief History"), "Sapiens_ A Brief History");
/// assert_eq!(sanitize_filename("AC/DC"), "AC_DC");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// File name for a cover image: sanitized title plus the image's extension
fn image_file_name(image_url: &Url, title: &str) -> String {
    let sanitized = sanitize_filename(title.trim());
    let mut stem: String = sanitized.chars().take(MAX_STEM_CHARS).collect();
    if stem.trim().is_empty() {
        stem = "untitled".to_string();
    }

    let extension = image_url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    format!("{}.{}", stem, extension)
}

fn parse_image_url(image_url: &str) -> OutputResult<Url> {
    Url::parse(image_url).map_err(|e| OutputError::InvalidUrl(format!("{}: {}", image_url, e)))
}

/// Downloads cover images over HTTP
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: Client,

    /// File paths handed out by `download_record`, with the image URL each one holds
    claimed: HashMap<PathBuf, String>,
}

impl ImageDownloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            claimed: HashMap::new(),
        }
    }

    /// Downloads a record's cover into `dest_folder`
    ///
    /// Named after the title like [`ImageDownloader::download`], unless an
    /// earlier record in this run already took that name for another image.
    /// Then the UPC is appended to the title, when the record has one.
    pub async fn download_record(
        &mut self,
        record: &BookRecord,
        dest_folder: &Path,
    ) -> OutputResult<PathBuf> {
        let url = parse_image_url(&record.image_url)?;
        let mut path = dest_folder.join(image_file_name(&url, &record.title));

        let taken_by = self.claimed.get(&path).filter(|held| **held != record.image_url);
        if let Some(held) = taken_by {
            let upc = record.external_id.trim();
            if upc.is_empty() {
                tracing::debug!(
                    "Reusing {} for {} although it holds {}",
                    path.display(),
                    record.image_url,
                    held
                );
            } else {
                let stem = format!("{} {}", record.title.trim(), upc);
                path = dest_folder.join(image_file_name(&url, &stem));
            }
        }

        self.claimed
            .entry(path.clone())
            .or_insert_with(|| record.image_url.clone());
        self.fetch_into(&url, dest_folder, path).await
    }

    /// Downloads one image into `dest_folder`, named after `title`
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Path of the stored file (existing or freshly written)
    /// * `Err(OutputError)` - Invalid URL, HTTP failure or write failure
    pub async fn download(
        &self,
        image_url: &str,
        dest_folder: &Path,
        title: &str,
    ) -> OutputResult<PathBuf> {
        let url = parse_image_url(image_url)?;
        let path = dest_folder.join(image_file_name(&url, title));
        self.fetch_into(&url, dest_folder, path).await
    }

    async fn fetch_into(&self, url: &Url, dest_folder: &Path, path: PathBuf) -> OutputResult<PathBuf> {
        let image_url = url.as_str();

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!("Image already present: {}", path.display());
            return Ok(path);
        }

        tokio::fs::create_dir_all(dest_folder).await?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| OutputError::Http {
                url: image_url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OutputError::Status {
                url: image_url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| OutputError::Http {
            url: image_url.to_string(),
            message: e.to_string(),
        })?;

        tokio::fs::write(&path, &bytes).await?;
        tracing::debug!("Stored {} bytes at {}", bytes.len(), path.display());

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("A Light in the Attic"), "A Light in the Attic");
        assert_eq!(sanitize_filename("Vol. 1 - The_Start"), "Vol. 1 - The_Start");
        assert_eq!(sanitize_filename("Who? What! Where*"), "Who_ What_ Where_");
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd");
    }

    #[test]
    fn test_image_file_name_uses_url_extension() {
        let name = image_file_name(&url("http://b.example/media/cache/fe/72/cover.PNG"), "Book");
        assert_eq!(name, "Book.png");
    }

    #[test]
    fn test_image_file_name_defaults_extension() {
        let name = image_file_name(&url("http://b.example/media/cover"), "Book");
        assert_eq!(name, "Book.jpg");
    }

    #[test]
    fn test_image_file_name_for_blank_title() {
        let name = image_file_name(&url("http://b.example/cover.jpg"), "   ");
        assert_eq!(name, "untitled.jpg");
    }

    #[test]
    fn test_image_file_name_truncates_long_titles() {
        let title = "x".repeat(400);
        let name = image_file_name(&url("http://b.example/cover.jpg"), &title);
        assert_eq!(name.len(), MAX_STEM_CHARS + ".jpg".len());
    }

    #[tokio::test]
    async fn test_existing_file_is_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("Book.jpg");
        std::fs::write(&existing, b"cached").unwrap();

        // Unroutable host: any request would fail
        let downloader = ImageDownloader::new(Client::new());
        let path = downloader
            .download("http://127.0.0.1:9/cover.jpg", dir.path(), "Book")
            .await
            .unwrap();

        assert_eq!(path, existing);
        assert_eq!(std::fs::read(&path).unwrap(), b"cached");
    }

    fn record(title: &str, upc: &str, image_url: &str) -> BookRecord {
        BookRecord {
            url: format!("http://b.example/catalogue/{}/index.html", upc),
            external_id: upc.to_string(),
            title: title.to_string(),
            price_including_tax: 0.0,
            price_excluding_tax: 0.0,
            available_count: 0,
            description: String::new(),
            category: "Poetry".to_string(),
            rating: 0,
            image_url: image_url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_same_title_different_cover_gets_upc_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Book.jpg"), b"first").unwrap();
        std::fs::write(dir.path().join("Book 222.jpg"), b"second").unwrap();

        // Both files exist, so no request is made
        let mut downloader = ImageDownloader::new(Client::new());
        let first = downloader
            .download_record(&record("Book", "111", "http://127.0.0.1:9/a.jpg"), dir.path())
            .await
            .unwrap();
        let second = downloader
            .download_record(&record("Book", "222", "http://127.0.0.1:9/b.jpg"), dir.path())
            .await
            .unwrap();

        assert_eq!(first, dir.path().join("Book.jpg"));
        assert_eq!(second, dir.path().join("Book 222.jpg"));
        assert_eq!(std::fs::read(&second).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_same_cover_keeps_title_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Book.jpg"), b"cover").unwrap();

        let mut downloader = ImageDownloader::new(Client::new());
        let cover = "http://127.0.0.1:9/a.jpg";
        let first = downloader
            .download_record(&record("Book", "111", cover), dir.path())
            .await
            .unwrap();
        let second = downloader
            .download_record(&record("Book", "222", cover), dir.path())
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_image_url() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = ImageDownloader::new(Client::new());

        let err = downloader
            .download("not a url", dir.path(), "Book")
            .await
            .unwrap_err();
        assert!(matches!(err, OutputError::InvalidUrl(_)));
    }
}
