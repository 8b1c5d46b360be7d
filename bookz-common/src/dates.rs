//! Date normalisation for user and CSV input
//!
//! Books carry optional start/end dates. Values arrive from HTML date inputs
//! (`YYYY-MM-DD`), from spreadsheets exported as CSV (`MM/DD/YYYY`) and from
//! older databases that stored whatever the import produced.

use chrono::NaiveDate;

const ISO_FORMAT: &str = "%Y-%m-%d";
const US_FORMAT: &str = "%m/%d/%Y";

/// Parse a date in `YYYY-MM-DD` or `MM/DD/YYYY` form
///
/// Empty strings, spreadsheet `nan` placeholders and anything unparseable
/// yield `None`.
///
/// ```
/// use bookz_common::dates::normalize_date;
/// use chrono::NaiveDate;
///
/// assert_eq!(normalize_date("2024-03-07"), NaiveDate::from_ymd_opt(2024, 3, 7));
/// assert_eq!(normalize_date("03/07/2024"), NaiveDate::from_ymd_opt(2024, 3, 7));
/// assert_eq!(normalize_date("next tuesday"), None);
/// ```
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        return None;
    }

    NaiveDate::parse_from_str(value, ISO_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, US_FORMAT))
        .ok()
}

/// Parse an optional form field; an absent or blank field is `Ok(None)`
///
/// Unlike [`normalize_date`], a non-empty value that cannot be parsed is an
/// error so that a typo in a form is reported instead of silently dropped.
pub fn parse_optional_date(raw: Option<&str>) -> crate::Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => normalize_date(value)
            .map(Some)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unrecognised date: {}", value))),
    }
}

/// Format a date the way it is stored in the database
pub fn to_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_dates() {
        assert_eq!(normalize_date("2023-12-31"), NaiveDate::from_ymd_opt(2023, 12, 31));
        assert_eq!(normalize_date("  2023-01-02 "), NaiveDate::from_ymd_opt(2023, 1, 2));
    }

    #[test]
    fn test_us_dates() {
        assert_eq!(normalize_date("12/31/2023"), NaiveDate::from_ymd_opt(2023, 12, 31));
        assert_eq!(normalize_date("1/2/2023"), NaiveDate::from_ymd_opt(2023, 1, 2));
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("NaN"), None);
        assert_eq!(normalize_date("31/12/2023"), None);
        assert_eq!(normalize_date("2023-02-30"), None);
    }

    #[test]
    fn test_parse_optional_date() {
        assert_eq!(parse_optional_date(None).unwrap(), None);
        assert_eq!(parse_optional_date(Some("   ")).unwrap(), None);
        assert_eq!(
            parse_optional_date(Some("2024-05-01")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
        assert!(parse_optional_date(Some("yesterday")).is_err());
    }

    #[test]
    fn test_to_iso() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        assert_eq!(to_iso(date), "2024-02-09");
    }
}
