//! Database models

use crate::isbn::normalize_isbn;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical (or not) format of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BookFormat {
    #[default]
    #[serde(rename = "NA")]
    Na,
    Audiobook,
    Hardcover,
    Paperback,
    #[serde(rename = "pdf")]
    Pdf,
}

impl BookFormat {
    pub const ALL: [BookFormat; 5] = [
        BookFormat::Na,
        BookFormat::Audiobook,
        BookFormat::Hardcover,
        BookFormat::Paperback,
        BookFormat::Pdf,
    ];

    /// Stored and displayed form
    pub fn as_str(&self) -> &'static str {
        match self {
            BookFormat::Na => "NA",
            BookFormat::Audiobook => "Audiobook",
            BookFormat::Hardcover => "Hardcover",
            BookFormat::Paperback => "Paperback",
            BookFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for BookFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookFormat {
    type Err = Error;

    /// Case-insensitive; blank input is [`BookFormat::Na`]
    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if value.is_empty() {
            return Ok(BookFormat::Na);
        }
        BookFormat::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown book format: {}", value)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub format: BookFormat,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub isbn: Option<String>,
    /// users.guid; `None` for rows that predate accounts
    pub owner: Option<String>,
}

/// Book as submitted by a form or an import row
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub format: BookFormat,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub isbn: Option<String>,
}

impl NewBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    /// Check the record and return it with trimmed text and a normalized ISBN
    pub fn validate(&self) -> Result<NewBook> {
        let title = self.title.trim();
        let author = self.author.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Title is required".to_string()));
        }
        if author.is_empty() {
            return Err(Error::InvalidInput("Author is required".to_string()));
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(Error::InvalidInput(
                    "End date cannot be before start date".to_string(),
                ));
            }
        }

        let isbn = match self.isbn.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                normalize_isbn(raw)
                    .ok_or_else(|| Error::InvalidInput(format!("Malformed ISBN: {}", raw)))?,
            ),
        };

        Ok(NewBook {
            title: title.to_string(),
            author: author.to_string(),
            format: self.format,
            start_date: self.start_date,
            end_date: self.end_date,
            isbn,
        })
    }
}

/// Score carried by a review
///
/// Older reviews use a single star rating; newer ones place the book on two
/// axes (how it is written, how useful it is).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewScore {
    Rating(i64),
    Axes { form: i64, function: i64 },
}

impl ReviewScore {
    pub const RATING_RANGE: std::ops::RangeInclusive<i64> = 1..=5;
    pub const AXIS_RANGE: std::ops::RangeInclusive<i64> = -10..=10;

    pub fn rating(value: i64) -> Result<Self> {
        if !Self::RATING_RANGE.contains(&value) {
            return Err(Error::InvalidInput(format!(
                "Rating must be between 1 and 5, got {}",
                value
            )));
        }
        Ok(ReviewScore::Rating(value))
    }

    pub fn axes(form: i64, function: i64) -> Result<Self> {
        for (name, value) in [("Form", form), ("Function", function)] {
            if !Self::AXIS_RANGE.contains(&value) {
                return Err(Error::InvalidInput(format!(
                    "{} must be between -10 and 10, got {}",
                    name, value
                )));
            }
        }
        Ok(ReviewScore::Axes { form, function })
    }

    /// Rebuild from stored columns; axes win when both are present
    pub fn from_columns(rating: Option<i64>, form: Option<i64>, function: Option<i64>) -> Option<Self> {
        match (form, function, rating) {
            (Some(form), Some(function), _) => Some(ReviewScore::Axes { form, function }),
            (_, _, Some(rating)) => Some(ReviewScore::Rating(rating)),
            _ => None,
        }
    }

    /// (rating, form, function) column values
    pub fn to_columns(&self) -> (Option<i64>, Option<i64>, Option<i64>) {
        match *self {
            ReviewScore::Rating(rating) => (Some(rating), None, None),
            ReviewScore::Axes { form, function } => (None, Some(form), Some(function)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: i64,
    pub book_id: Option<i64>,
    /// Title of the reviewed book, `None` if the book is gone
    pub book_title: Option<String>,
    pub score: Option<ReviewScore>,
    pub comment: String,
}

/// Validated review ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub book_id: i64,
    pub score: ReviewScore,
    pub comment: String,
}

impl NewReview {
    /// Re-checks the score so hand-built variants cannot bypass the ranges
    pub fn new(book_id: i64, score: ReviewScore, comment: impl Into<String>) -> Result<Self> {
        let score = match score {
            ReviewScore::Rating(value) => ReviewScore::rating(value)?,
            ReviewScore::Axes { form, function } => ReviewScore::axes(form, function)?,
        };
        Ok(Self {
            book_id,
            score,
            comment: comment.into().trim().to_string(),
        })
    }
}

/// One dot on the form/function chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub review_id: i64,
    pub title: String,
    pub form: i64,
    pub function: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub guid: String,
    pub username: String,
}
