//! CSV export of the final record set

use crate::model::ExportedRecord;
use crate::output::OutputResult;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Column order of the export; written even when there are no records
pub const CSV_HEADERS: [&str; 11] = [
    "product_page_url",
    "universal_product_code",
    "title",
    "price_including_tax",
    "price_excluding_tax",
    "number_available",
    "product_description",
    "category",
    "review_rating",
    "image_url",
    "local_image_path",
];

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    product_page_url: &'a str,
    universal_product_code: &'a str,
    title: &'a str,
    price_including_tax: f64,
    price_excluding_tax: f64,
    number_available: u32,
    product_description: &'a str,
    category: &'a str,
    review_rating: u8,
    image_url: &'a str,
    local_image_path: String,
}

impl<'a> From<&'a ExportedRecord> for CsvRow<'a> {
    fn from(exported: &'a ExportedRecord) -> Self {
        let record = &exported.record;
        Self {
            product_page_url: &record.url,
            universal_product_code: &record.external_id,
            title: &record.title,
            price_including_tax: record.price_including_tax,
            price_excluding_tax: record.price_excluding_tax,
            number_available: record.available_count,
            product_description: &record.description,
            category: &record.category,
            review_rating: record.rating,
            image_url: &record.image_url,
            local_image_path: exported
                .local_image_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Writes the header and one row per record to any writer
pub fn write_records<W: Write>(writer: W, records: &[ExportedRecord]) -> OutputResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(CSV_HEADERS)?;
    for record in records {
        csv_writer.serialize(CsvRow::from(record))?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// Writes the record set to a CSV file, creating parent folders as needed
///
/// # Arguments
///
/// * `path` - Destination file; replaced if it exists
/// * `records` - Final, deduplicated records
pub fn write_csv(path: &Path, records: &[ExportedRecord]) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    write_records(file, records)?;

    tracing::info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BookRecord;
    use std::path::PathBuf;

    fn record() -> ExportedRecord {
        ExportedRecord {
            record: BookRecord {
                url: "http://books.example/catalogue/book_1/index.html".to_string(),
                external_id: "a897fe39b1053632".to_string(),
                title: "Tipping the Velvet, \"Illustrated\"".to_string(),
                price_including_tax: 51.77,
                price_excluding_tax: 50.1,
                available_count: 22,
                description: "Line one\nline two".to_string(),
                category: "Historical Fiction".to_string(),
                rating: 3,
                image_url: "http://books.example/media/cover.jpg".to_string(),
            },
            local_image_path: Some(PathBuf::from("images/Tipping the Velvet.jpg")),
        }
    }

    fn render(records: &[ExportedRecord]) -> String {
        let mut buffer = Vec::new();
        write_records(&mut buffer, records).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_header_written_for_empty_set() {
        let output = render(&[]);
        assert_eq!(output, format!("{}\n", CSV_HEADERS.join(",")));
    }

    #[test]
    fn test_row_follows_column_order() {
        let output = render(&[record()]);

        let mut reader = csv::Reader::from_reader(output.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADERS.to_vec());

        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(&row[0], "http://books.example/catalogue/book_1/index.html");
        assert_eq!(&row[1], "a897fe39b1053632");
        assert_eq!(&row[2], "Tipping the Velvet, \"Illustrated\"");
        assert_eq!(&row[3], "51.77");
        assert_eq!(&row[5], "22");
        assert_eq!(&row[6], "Line one\nline two");
        assert_eq!(&row[7], "Historical Fiction");
        assert_eq!(&row[8], "3");
        assert_eq!(&row[10], "images/Tipping the Velvet.jpg");
    }

    #[test]
    fn test_missing_image_path_is_empty_column() {
        let mut exported = record();
        exported.local_image_path = None;
        let output = render(&[exported]);

        let mut reader = csv::Reader::from_reader(output.as_bytes());
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[10], "");
    }

    #[test]
    fn test_write_csv_creates_parent_folders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/books.csv");

        write_csv(&path, &[record(), record()]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        assert_eq!(reader.records().count(), 2);
    }
}
