//! Run report: counts per stage and skip counts per failure kind

use crate::crawler::FailureKind;
use crate::output::OutputResult;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Summary of one harvest run
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Catalog root that was harvested
    pub root_url: String,

    /// SHA-256 of the configuration file, when one was used
    pub config_hash: Option<String>,

    /// Categories found on the root page
    pub categories: usize,

    /// Listing pages fetched across all categories
    pub pages_walked: usize,

    /// Work items submitted for extraction
    pub references: usize,

    /// Work items that produced a record
    pub extracted: usize,

    /// Records kept after deduplication
    pub records: usize,

    pub duplicate_urls: u64,
    pub duplicate_titles: u64,

    /// Walk and extraction failures per kind
    pub skipped: BTreeMap<FailureKind, u64>,

    pub images_downloaded: usize,
    pub images_failed: usize,

    /// Whether the run was cut short by cancellation
    pub cancelled: bool,

    /// Where the CSV was written
    pub csv_path: PathBuf,
}

impl HarvestReport {
    pub fn total_skipped(&self) -> u64 {
        self.skipped.values().sum()
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Prints the report to stdout
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Summary ===\n");

    println!("Overview:");
    println!("  Root: {}", report.root_url);
    println!("  Categories: {}", report.categories);
    println!("  Listing pages walked: {}", report.pages_walked);
    println!("  Detail pages submitted: {}", report.references);
    println!("  Records extracted: {}", report.extracted);
    println!("  Records kept: {}", report.records);
    println!(
        "  Duplicates removed: {} by URL, {} by title",
        report.duplicate_urls, report.duplicate_titles
    );
    println!();

    if !report.skipped.is_empty() {
        println!("Skipped ({}):", report.total_skipped());
        for (kind, count) in &report.skipped {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if report.images_downloaded > 0 || report.images_failed > 0 {
        println!(
            "Images: {} stored, {} failed",
            report.images_downloaded, report.images_failed
        );
    }

    if report.cancelled {
        println!("Run was cancelled; results are partial.");
    }

    println!(
        "Wrote {} records to {} in {}s",
        report.records,
        report.csv_path.display(),
        report.duration_seconds()
    );
}

/// Formats the report as markdown
pub fn format_markdown_report(report: &HarvestReport) -> String {
    let mut md = String::new();

    md.push_str("# Shelf-Harvest Run Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Root**: {}\n", report.root_url));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        report.duration_seconds()
    ));
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push_str(&format!(
        "- **Status**: {}\n\n",
        if report.cancelled { "cancelled" } else { "completed" }
    ));

    md.push_str("## Pipeline\n\n");
    md.push_str("| Stage | Count |\n");
    md.push_str("|-------|-------|\n");
    md.push_str(&format!("| Categories | {} |\n", report.categories));
    md.push_str(&format!("| Listing pages | {} |\n", report.pages_walked));
    md.push_str(&format!("| Detail pages submitted | {} |\n", report.references));
    md.push_str(&format!("| Records extracted | {} |\n", report.extracted));
    md.push_str(&format!("| Duplicate URLs | {} |\n", report.duplicate_urls));
    md.push_str(&format!("| Duplicate titles | {} |\n", report.duplicate_titles));
    md.push_str(&format!("| Records kept | {} |\n\n", report.records));

    if !report.skipped.is_empty() {
        md.push_str("## Skipped\n\n");
        md.push_str("| Failure | Count |\n");
        md.push_str("|---------|-------|\n");
        for (kind, count) in &report.skipped {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    md.push_str("## Output\n\n");
    md.push_str(&format!("- **CSV**: {}\n", report.csv_path.display()));
    md.push_str(&format!(
        "- **Images**: {} stored, {} failed\n",
        report.images_downloaded, report.images_failed
    ));

    md
}

/// Writes the markdown report to `output_path`
pub fn write_markdown_report(report: &HarvestReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}
