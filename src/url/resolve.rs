use crate::url::CATALOG_SEGMENT;
use url::Url;

/// Resolves an href against a base URL
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: schemes
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution
///
/// # Examples
///
/// ```
/// use shelf_harvest::url::resolve_href;
/// use url::Url;
///
/// let page = Url::parse("http://books.example/catalogue/category/books/travel_2/index.html").unwrap();
/// let next = resolve_href(&page, "page-2.html").unwrap();
/// assert_eq!(next.as_str(), "http://books.example/catalogue/category/books/travel_2/page-2.html");
/// ```
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}

/// Resolves an item anchor found on a listing page
///
/// Listing pages sit at varying depths below the catalog, so item hrefs climb
/// back up with a variable number of `../` segments. Those are stripped and
/// the remainder is joined onto the catalog base. An href already rooted at
/// `catalogue/` (as on the site's front page) joins onto the root instead.
pub fn resolve_item_href(catalog_base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    // Absolute URLs need no rebasing
    if Url::parse(href).is_ok() {
        return resolve_href(catalog_base, href);
    }

    let mut relative = href;
    loop {
        if let Some(rest) = relative.strip_prefix("../") {
            relative = rest;
        } else if let Some(rest) = relative.strip_prefix("./") {
            relative = rest;
        } else {
            break;
        }
    }

    if relative.starts_with(CATALOG_SEGMENT) {
        let root = catalog_base.join("..").ok()?;
        return resolve_href(&root, relative);
    }

    resolve_href(catalog_base, relative.trim_start_matches('/'))
}
