//! CSV bulk import
//!
//! Accepts spreadsheet exports with a header row. Recognised columns
//! (case-insensitive, surrounding spaces ignored): `title`, `author`,
//! `isbn`, `format`, `start_date`, `end_date`. Either `title` + `author` or
//! `isbn` must be present. Rows missing a title or author are completed from
//! the catalog when they carry an ISBN.

use bookz_common::dates::normalize_date;
use bookz_common::db::books::insert_book;
use bookz_common::db::models::{BookFormat, NewBook};
use bookz_common::isbn::normalize_isbn;
use bookz_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::openlibrary::OpenLibraryClient;

/// Outcome of one import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    /// Rows whose title and/or author came from the catalog
    pub autofilled: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Data row (1-based, header excluded) that was not imported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

struct Columns {
    title: Option<usize>,
    author: Option<usize>,
    isbn: Option<usize>,
    format: Option<usize>,
    start_date: Option<usize>,
    end_date: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| names.iter().position(|h| h == name);

        let columns = Columns {
            title: find("title"),
            author: find("author"),
            isbn: find("isbn"),
            format: find("format"),
            start_date: find("start_date"),
            end_date: find("end_date"),
        };

        let has_title_author = columns.title.is_some() && columns.author.is_some();
        if !has_title_author && columns.isbn.is_none() {
            return Err(Error::InvalidInput(
                "CSV must include either title and author columns, or an isbn column".to_string(),
            ));
        }
        Ok(columns)
    }
}

/// Cell value with blanks and spreadsheet `nan` placeholders treated as absent
fn cell(record: &csv::StringRecord, index: Option<usize>) -> Option<String> {
    let value = record.get(index?)?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(value.to_string())
    }
}

/// Import every row of `data` for `owner`
///
/// `lookup` is `None` when ISBN lookups are disabled; rows that would need
/// one are then skipped.
pub async fn import_csv(
    pool: &SqlitePool,
    owner: &str,
    data: &[u8],
    lookup: Option<&OpenLibraryClient>,
) -> Result<ImportReport> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| Error::InvalidInput(format!("Unreadable CSV header: {}", e)))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut report = ImportReport::default();

    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                report.skipped.push(SkippedRow {
                    row,
                    reason: format!("Unreadable row: {}", e),
                });
                continue;
            }
        };

        let mut title = cell(&record, columns.title);
        let mut author = cell(&record, columns.author);

        let isbn = cell(&record, columns.isbn).and_then(|raw| {
            let normalized = normalize_isbn(&raw);
            if normalized.is_none() {
                warn!(row, isbn = %raw, "Ignoring malformed ISBN");
            }
            normalized
        });

        if title.is_none() || author.is_none() {
            if let (Some(isbn), Some(client)) = (isbn.as_deref(), lookup) {
                match client.lookup_isbn(isbn).await {
                    Ok(Some(details)) => {
                        let mut filled = false;
                        if title.is_none() && !details.title.is_empty() {
                            title = Some(details.title);
                            filled = true;
                        }
                        if author.is_none() && !details.author.is_empty() {
                            author = Some(details.author);
                            filled = true;
                        }
                        if filled {
                            report.autofilled += 1;
                        }
                    }
                    Ok(None) => debug!(row, isbn, "ISBN not found in catalog"),
                    Err(e) => warn!(row, isbn, "ISBN lookup failed: {}", e),
                }
            }
        }

        let (Some(title), Some(author)) = (title, author) else {
            report.skipped.push(SkippedRow {
                row,
                reason: "Missing title or author".to_string(),
            });
            continue;
        };

        let format = cell(&record, columns.format)
            .map(|raw| {
                raw.parse::<BookFormat>().unwrap_or_else(|_| {
                    debug!(row, format = %raw, "Unknown format, using NA");
                    BookFormat::Na
                })
            })
            .unwrap_or_default();

        let book = NewBook {
            title,
            author,
            format,
            start_date: cell(&record, columns.start_date).as_deref().and_then(normalize_date),
            end_date: cell(&record, columns.end_date).as_deref().and_then(normalize_date),
            isbn,
        };

        match insert_book(pool, owner, &book).await {
            Ok(_) => report.imported += 1,
            Err(Error::InvalidInput(reason)) => report.skipped.push(SkippedRow { row, reason }),
            Err(e) => return Err(e),
        }
    }

    info!(
        imported = report.imported,
        autofilled = report.autofilled,
        skipped = report.skipped.len(),
        "CSV import finished"
    );
    Ok(report)
}
