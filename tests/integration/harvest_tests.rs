//! End-to-end harvest tests
//!
//! These tests use wiremock to serve a small catalog over real HTTP and run
//! the full pipeline: enumeration, pagination, extraction, deduplication,
//! image download and CSV export.

use shelf_harvest::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use shelf_harvest::crawler::{run_harvest, Harvester};
use shelf_harvest::{FailureKind, HarvestError};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHARED_SLUG: &str = "shared-book_99";

/// (category slug, category name, pages of item slugs)
fn catalog_layout() -> Vec<(&'static str, &'static str, Vec<Vec<&'static str>>)> {
    vec![
        (
            "travel_2",
            "Travel",
            vec![
                vec!["travel-one_1", "travel-two_2"],
                vec!["travel-three_3", SHARED_SLUG],
                vec!["travel-five_5", "travel-six_6"],
            ],
        ),
        (
            "mystery_3",
            "Mystery",
            vec![
                vec!["mystery-one_11", "mystery-two_12"],
                vec!["mystery-three_13", "mystery-four_14"],
                vec!["mystery-five_15", SHARED_SLUG],
            ],
        ),
    ]
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(root_url: &str, out_dir: &Path, download_images: bool) -> Config {
    Config {
        crawler: CrawlerConfig {
            root_url: root_url.to_string(),
            concurrency: 4,
            fetch_timeout_ms: 5_000,
            strict_required_fields: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            csv_path: out_dir.join("books.csv").display().to_string(),
            image_dir: out_dir.join("images").display().to_string(),
            download_images,
            summary_path: Some(out_dir.join("summary.md").display().to_string()),
        },
    }
}

fn title_of(slug: &str) -> String {
    let stem = slug.split('_').next().unwrap_or(slug);
    stem.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

fn detail_page(slug: &str) -> String {
    format!(
        r#"<html><body>
        <div id="product_gallery"><div class="item active"><img src="../../media/{slug}.jpg"/></div></div>
        <div class="product_main">
          <h1>{title}</h1>
          <p class="price_color">£12.50</p>
          <p class="instock availability">In stock (3 available)</p>
          <p class="star-rating Four"></p>
        </div>
        <div id="product_description"><h2>Product Description</h2></div>
        <p>About {title}.</p>
        <table>
          <tr><th>UPC</th><td>upc-{slug}</td></tr>
          <tr><th>Price (excl. tax)</th><td>£10.00</td></tr>
          <tr><th>Price (incl. tax)</th><td>£12.50</td></tr>
        </table>
        </body></html>"#,
        slug = slug,
        title = title_of(slug)
    )
}

/// Mounts the root page, every listing page and every detail page
async fn mount_catalog(server: &MockServer) {
    let layout = catalog_layout();

    let nav: String = layout
        .iter()
        .map(|(slug, name, _)| {
            format!(
                r#"<li><a href="catalogue/category/books/{}/index.html">{}</a></li>"#,
                slug, name
            )
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><body><div class="side_categories"><ul><li>
            <a href="catalogue/category/books_1/index.html">Books</a>
            <ul>{}</ul></li></ul></div></body></html>"#,
            nav
        )))
        .mount(server)
        .await;

    let mut details = Vec::new();
    for (category_slug, _, pages) in &layout {
        for (i, items) in pages.iter().enumerate() {
            let page_name = if i == 0 {
                "index.html".to_string()
            } else {
                format!("page-{}.html", i + 1)
            };

            let mut body: String = items
                .iter()
                .map(|slug| {
                    format!(
                        r#"<article class="product_pod"><h3><a href="../../../{}/index.html">{}</a></h3></article>"#,
                        slug,
                        title_of(slug)
                    )
                })
                .collect();
            if i + 1 < pages.len() {
                body.push_str(&format!(
                    r#"<ul class="pager"><li class="next"><a href="page-{}.html">next</a></li></ul>"#,
                    i + 2
                ));
            }

            Mock::given(method("GET"))
                .and(path(format!(
                    "/catalogue/category/books/{}/{}",
                    category_slug, page_name
                )))
                .respond_with(html(format!("<html><body>{}</body></html>", body)))
                .mount(server)
                .await;

            details.extend(items.iter().copied());
        }
    }

    details.sort_unstable();
    details.dedup();
    for slug in details {
        Mock::given(method("GET"))
            .and(path(format!("/catalogue/{}/index.html", slug)))
            .respond_with(html(detail_page(slug)))
            .mount(server)
            .await;
    }
}

fn read_rows(csv_path: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(csv_path).expect("Failed to open CSV");
    reader
        .records()
        .map(|r| r.expect("Malformed CSV row"))
        .collect()
}

#[tokio::test]
async fn test_full_harvest_drops_cross_listed_duplicate() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    // Every cover is stored once, the shared one included
    Mock::given(method("GET"))
        .and(path(format!("/media/{}.jpg", SHARED_SLUG)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"shared-cover".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"cover".to_vec()))
        .mount(&mock_server)
        .await;

    let out = tempfile::tempdir().expect("Failed to create temp dir");
    let root = format!("{}/", mock_server.uri());
    let config = create_test_config(&root, out.path(), true);

    let report = run_harvest(config).await.expect("Harvest failed");

    assert_eq!(report.categories, 2);
    assert_eq!(report.pages_walked, 6);
    assert_eq!(report.references, 12);
    assert_eq!(report.extracted, 12);
    assert_eq!(report.records, 11);
    assert_eq!(report.duplicate_urls, 1);
    assert_eq!(report.total_skipped(), 0);
    assert_eq!(report.images_downloaded, 11);
    assert_eq!(report.images_failed, 0);
    assert!(!report.cancelled);

    let rows = read_rows(&out.path().join("books.csv"));
    assert_eq!(rows.len(), 11);

    let shared: Vec<_> = rows
        .iter()
        .filter(|row| row[0].ends_with(&format!("/catalogue/{}/index.html", SHARED_SLUG)))
        .collect();
    assert_eq!(shared.len(), 1);

    let shared = shared[0];
    assert_eq!(&shared[1], "upc-shared-book_99");
    assert_eq!(&shared[2], "Shared Book");
    assert_eq!(shared[3].parse::<f64>().unwrap(), 12.5);
    assert_eq!(shared[4].parse::<f64>().unwrap(), 10.0);
    assert_eq!(&shared[5], "3");
    assert_eq!(&shared[6], "About Shared Book.");
    // First listing in catalog order wins
    assert_eq!(&shared[7], "Travel");
    assert_eq!(&shared[8], "4");

    let image_path = Path::new(&shared[10]);
    assert_eq!(
        image_path.file_name().and_then(|n| n.to_str()),
        Some("Shared Book.jpg")
    );
    assert_eq!(std::fs::read(image_path).unwrap(), b"shared-cover");

    let image_files = std::fs::read_dir(out.path().join("images")).unwrap().count();
    assert_eq!(image_files, 11);

    let summary = std::fs::read_to_string(out.path().join("summary.md")).unwrap();
    assert!(summary.contains("| Records kept | 11 |"));
}

#[tokio::test]
async fn test_failing_detail_page_is_isolated() {
    let mock_server = MockServer::start().await;

    // Registered first so it takes precedence over the catalog's detail mock
    Mock::given(method("GET"))
        .and(path("/catalogue/mystery-two_12/index.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_catalog(&mock_server).await;

    let out = tempfile::tempdir().expect("Failed to create temp dir");
    let root = format!("{}/", mock_server.uri());
    let config = create_test_config(&root, out.path(), false);

    let report = run_harvest(config).await.expect("Harvest failed");

    assert_eq!(report.references, 12);
    assert_eq!(report.extracted, 11);
    assert_eq!(report.records, 10);
    assert_eq!(report.skipped.get(&FailureKind::Fetch), Some(&1));

    let rows = read_rows(&out.path().join("books.csv"));
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().all(|row| &row[2] != "Mystery Two"));
    assert!(rows.iter().all(|row| row[10].is_empty()));
}

#[tokio::test]
async fn test_missing_root_page_aborts_run() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let out = tempfile::tempdir().expect("Failed to create temp dir");
    let root = format!("{}/", mock_server.uri());
    let config = create_test_config(&root, out.path(), false);

    let err = run_harvest(config).await.unwrap_err();

    assert!(matches!(err, HarvestError::Enumeration(_)));
    assert!(!out.path().join("books.csv").exists());
}

#[tokio::test]
async fn test_pre_cancelled_run_writes_empty_export() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let out = tempfile::tempdir().expect("Failed to create temp dir");
    let root = format!("{}/", mock_server.uri());
    let config = create_test_config(&root, out.path(), false);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = Harvester::new(config)
        .expect("Failed to build harvester")
        .run(cancel)
        .await
        .expect("Harvest failed");

    assert!(report.cancelled);
    assert_eq!(report.records, 0);
    assert!(read_rows(&out.path().join("books.csv")).is_empty());
}
