//! Books page: add, import, list, delete

use axum::{
    extract::{Multipart, Path, Query, State},
    response::{Html, Redirect},
    Form,
};
use bookz_common::dates::parse_optional_date;
use bookz_common::db::models::{Book, BookFormat, NewBook};
use bookz_common::db::{books, settings};
use serde::Deserialize;
use tracing::info;

use super::{html_escape, layout, redirect_with, Flash};
use crate::api::PageUser;
use crate::import::{import_csv, ImportReport};
use crate::{ApiError, AppState};

/// Skipped rows listed individually in the import summary
const MAX_SKIPPED_SHOWN: usize = 5;

const LOOKUP_SCRIPT: &str = r#"
<script>
async function lookupIsbn() {
    const isbn = document.getElementById('isbn').value.trim();
    const status = document.getElementById('lookup-status');
    const cover = document.getElementById('cover');
    cover.style.display = 'none';
    if (!isbn) { return; }
    status.textContent = 'Looking up...';
    try {
        const response = await fetch('/api/lookup/' + encodeURIComponent(isbn));
        const body = await response.json();
        if (!response.ok) {
            status.textContent = body.error ? body.error.message : 'Lookup failed';
            return;
        }
        if (!body.found) {
            status.textContent = 'No catalog entry for this ISBN';
            return;
        }
        if (body.title) { document.getElementById('title').value = body.title; }
        if (body.author) { document.getElementById('author').value = body.author; }
        if (body.cover_url) { cover.src = body.cover_url; cover.style.display = 'block'; }
        status.textContent = 'Book details found via ISBN';
    } catch (e) {
        status.textContent = 'Lookup failed: ' + e;
    }
}
</script>
"#;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub format: String,
    pub start_date: String,
    pub end_date: String,
    pub isbn: String,
}

impl BookForm {
    fn into_new_book(self) -> Result<NewBook, ApiError> {
        let isbn = self.isbn.trim();
        Ok(NewBook {
            format: self.format.parse::<BookFormat>()?,
            start_date: parse_optional_date(Some(&self.start_date))?,
            end_date: parse_optional_date(Some(&self.end_date))?,
            isbn: (!isbn.is_empty()).then(|| isbn.to_string()),
            title: self.title,
            author: self.author,
        })
    }
}

/// Reading dates edited from the books table
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatesForm {
    pub start_date: String,
    pub end_date: String,
}

fn format_options() -> String {
    BookFormat::ALL
        .iter()
        .map(|f| format!(r#"<option value="{0}">{0}</option>"#, f))
        .collect()
}

fn book_rows(books: &[Book]) -> String {
    if books.is_empty() {
        return r#"<tr><td colspan="7">No books yet.</td></tr>"#.to_string();
    }

    books
        .iter()
        .map(|book| {
            let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
            format!(
                r#"<tr>
                    <td>{id}</td><td>{title}</td><td>{author}</td><td>{format}</td>
                    <td><form class="dates" method="post" action="/books/{id}/dates">
                        <input type="date" name="start_date" value="{start}" aria-label="Start date">
                        <input type="date" name="end_date" value="{end}" aria-label="End date">
                        <button type="submit">Save</button>
                    </form></td>
                    <td>{isbn}</td>
                    <td><form method="post" action="/books/{id}/delete"
                              onsubmit="return confirm('Delete this book and its reviews?')">
                        <button class="danger" type="submit">Delete</button>
                    </form></td>
                </tr>"#,
                id = book.id,
                title = html_escape(&book.title),
                author = html_escape(&book.author),
                format = book.format,
                start = date(book.start_date),
                end = date(book.end_date),
                isbn = html_escape(book.isbn.as_deref().unwrap_or("")),
            )
        })
        .collect()
}

/// GET /
pub async fn books_page(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Query(flash): Query<Flash>,
) -> Result<Html<String>, ApiError> {
    let books = books::list_books(&state.db, &user.guid).await?;
    let lookup_enabled = settings::get_isbn_lookup_enabled(&state.db).await?;

    let lookup_button = if lookup_enabled {
        r#"<button type="button" onclick="lookupIsbn()">Look up</button>"#
    } else {
        ""
    };

    let content = format!(
        r#"<section>
            <h2>Add a new book</h2>
            <form method="post" action="/books">
                <div class="row">
                    <div><label for="isbn">ISBN (optional)</label><input id="isbn" name="isbn"></div>
                    <div>{lookup_button}</div>
                    <div id="lookup-status"></div>
                </div>
                <img id="cover" alt="Cover" width="120" style="display:none; margin-top:8px">
                <div class="row">
                    <div><label for="title">Title</label><input id="title" name="title" required></div>
                    <div><label for="author">Author</label><input id="author" name="author" required></div>
                    <div><label for="format">Format</label><select id="format" name="format">{formats}</select></div>
                    <div><label for="start_date">Start date</label><input id="start_date" name="start_date" type="date"></div>
                    <div><label for="end_date">End date</label><input id="end_date" name="end_date" type="date"></div>
                </div>
                <p><button type="submit">Add Book</button></p>
            </form>
        </section>
        <section>
            <h2>Bulk import (CSV)</h2>
            <p>Columns: <code>title</code>, <code>author</code>, <code>isbn</code>, <code>format</code>,
               <code>start_date</code>, <code>end_date</code>. Either title and author, or isbn, are required.</p>
            <form method="post" action="/books/import" enctype="multipart/form-data">
                <input type="file" name="file" accept=".csv,text/csv" required>
                <button type="submit">Import</button>
            </form>
        </section>
        <section>
            <h2>Books ({count})</h2>
            <table>
                <thead><tr><th>ID</th><th>Title</th><th>Author</th><th>Format</th>
                    <th>Start / end</th><th>ISBN</th><th></th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </section>
        {script}"#,
        lookup_button = lookup_button,
        formats = format_options(),
        count = books.len(),
        rows = book_rows(&books),
        script = LOOKUP_SCRIPT,
    );

    Ok(layout("Books", Some(&user), &flash, &content))
}

/// POST /books
pub async fn add_book(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Form(form): Form<BookForm>,
) -> Redirect {
    let result = async {
        let new_book = form.into_new_book()?;
        Ok::<_, ApiError>(books::insert_book(&state.db, &user.guid, &new_book).await?)
    }
    .await;

    match result {
        Ok(book) => {
            info!(book_id = book.id, "Book added");
            redirect_with("/", "msg", &format!("Book '{}' added!", book.title))
        }
        Err(e) => redirect_with("/", "err", &e.user_message()),
    }
}

/// POST /books/:id/dates
///
/// Setting an end date marks the book finished, which makes it reviewable.
pub async fn update_dates(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(id): Path<i64>,
    Form(form): Form<DatesForm>,
) -> Redirect {
    let result = async {
        let start = parse_optional_date(Some(&form.start_date))?;
        let end = parse_optional_date(Some(&form.end_date))?;
        Ok::<_, ApiError>(books::update_dates(&state.db, &user.guid, id, start, end).await?)
    }
    .await;

    match result {
        Ok(book) => {
            info!(book_id = book.id, "Book dates updated");
            redirect_with("/", "msg", &format!("Dates for '{}' saved", book.title))
        }
        Err(e) => redirect_with("/", "err", &e.user_message()),
    }
}

/// POST /books/:id/delete
pub async fn delete_book(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(id): Path<i64>,
) -> Redirect {
    match books::delete_book(&state.db, &user.guid, id).await {
        Ok(()) => redirect_with("/", "msg", "Book deleted"),
        Err(e) => redirect_with("/", "err", &ApiError::from(e).user_message()),
    }
}

/// POST /books/import
pub async fn import_books(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    multipart: Multipart,
) -> Redirect {
    match run_import(&state, &user.guid, multipart).await {
        Ok(report) => redirect_with("/", "msg", &import_summary(&report)),
        Err(e) => redirect_with("/", "err", &e.user_message()),
    }
}

async fn run_import(state: &AppState, owner: &str, mut multipart: Multipart) -> Result<ImportReport, ApiError> {
    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Upload failed: {}", e)))?;
            data = Some(bytes);
        }
    }

    let data = data.ok_or_else(|| ApiError::BadRequest("No CSV file uploaded".to_string()))?;

    let lookup = if settings::get_isbn_lookup_enabled(&state.db).await? {
        Some(&state.lookup)
    } else {
        None
    };

    Ok(import_csv(&state.db, owner, &data, lookup).await?)
}

fn import_summary(report: &ImportReport) -> String {
    let mut summary = format!(
        "Imported {} book(s), {} auto-filled from ISBN",
        report.imported, report.autofilled
    );

    if !report.skipped.is_empty() {
        let details: Vec<String> = report
            .skipped
            .iter()
            .take(MAX_SKIPPED_SHOWN)
            .map(|s| format!("row {}: {}", s.row, s.reason))
            .collect();
        summary.push_str(&format!("; skipped {} ({})", report.skipped.len(), details.join("; ")));
        if report.skipped.len() > MAX_SKIPPED_SHOWN {
            summary.push_str(" ...");
        }
    }
    summary
}
