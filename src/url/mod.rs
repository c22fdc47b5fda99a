//! URL handling module for Shelf-Harvest
//!
//! Catalog pages link with relative hrefs of three flavors, each resolved
//! against a different base:
//!
//! - category links, against the site root
//! - item anchors (`../../../book_1/index.html`), against the catalog base
//! - "next" cursors (`page-2.html`), against the current listing page

mod resolve;

pub use resolve::{resolve_href, resolve_item_href};

use url::Url;

/// Path segment under which every listing and detail page lives
pub const CATALOG_SEGMENT: &str = "catalogue/";

/// Returns the catalog base URL (`<root>/catalogue/`) for a site root
///
/// # Examples
///
/// ```
/// use shelf_harvest::url::catalog_base;
/// use url::Url;
///
/// let root = Url::parse("http://books.toscrape.com/").unwrap();
/// assert_eq!(
///     catalog_base(&root).unwrap().as_str(),
///     "http://books.toscrape.com/catalogue/"
/// );
/// ```
pub fn catalog_base(root: &Url) -> Result<Url, url::ParseError> {
    directory_of(root).join(CATALOG_SEGMENT)
}

/// Returns `url` with a trailing slash so relative joins descend into it
///
/// A root given as `http://host/shop` is treated as the directory `/shop/`,
/// while `http://host/index.html` is left alone.
pub fn directory_of(url: &Url) -> Url {
    let mut dir = url.clone();
    dir.set_query(None);
    dir.set_fragment(None);

    let path = dir.path().to_string();
    let last = path.rsplit('/').next().unwrap_or("");
    if !path.ends_with('/') && !last.contains('.') {
        dir.set_path(&format!("{}/", path));
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_base_from_root() {
        let root = Url::parse("http://books.example/").unwrap();
        assert_eq!(
            catalog_base(&root).unwrap().as_str(),
            "http://books.example/catalogue/"
        );
    }

    #[test]
    fn test_catalog_base_from_root_without_trailing_slash() {
        let root = Url::parse("http://books.example/shop").unwrap();
        assert_eq!(
            catalog_base(&root).unwrap().as_str(),
            "http://books.example/shop/catalogue/"
        );
    }

    #[test]
    fn test_catalog_base_from_index_page() {
        let root = Url::parse("http://books.example/index.html").unwrap();
        assert_eq!(
            catalog_base(&root).unwrap().as_str(),
            "http://books.example/catalogue/"
        );
    }

    #[test]
    fn test_directory_of_drops_query() {
        let url = Url::parse("http://books.example/shop/?page=2#top").unwrap();
        assert_eq!(directory_of(&url).as_str(), "http://books.example/shop/");
    }
}
