//! ISBN normalisation and validation

/// Strip separators and check the shape of an ISBN
///
/// Accepts ISBN-10 (nine digits followed by a digit or `X`) and ISBN-13
/// (thirteen digits). Spaces and hyphens are removed; a trailing lower-case
/// `x` is upper-cased. Checksums are not enforced here, see
/// [`is_checksum_valid`].
///
/// ```
/// use bookz_common::isbn::normalize_isbn;
///
/// assert_eq!(normalize_isbn("978-0-14-044913-6").as_deref(), Some("9780140449136"));
/// assert_eq!(normalize_isbn("0-306-40615-x").as_deref(), Some("030640615X"));
/// assert_eq!(normalize_isbn("12345"), None);
/// ```
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    // Lengths below are byte counts
    if !cleaned.is_ascii() {
        return None;
    }

    let well_formed = match cleaned.len() {
        10 => {
            let (body, check) = cleaned.split_at(9);
            body.chars().all(|c| c.is_ascii_digit())
                && check.chars().all(|c| c.is_ascii_digit() || c == 'X')
        }
        13 => cleaned.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    };

    well_formed.then_some(cleaned)
}

/// Verify the check digit of a normalised ISBN-10 or ISBN-13
pub fn is_checksum_valid(isbn: &str) -> bool {
    match isbn.len() {
        10 => {
            let mut sum = 0u32;
            for (i, c) in isbn.chars().enumerate() {
                let value = match c {
                    'X' if i == 9 => 10,
                    c => match c.to_digit(10) {
                        Some(d) => d,
                        None => return false,
                    },
                };
                sum += value * (10 - i as u32);
            }
            sum % 11 == 0
        }
        13 => {
            let mut sum = 0u32;
            for (i, c) in isbn.chars().enumerate() {
                let Some(d) = c.to_digit(10) else {
                    return false;
                };
                sum += if i % 2 == 0 { d } else { d * 3 };
            }
            sum % 10 == 0
        }
        _ => false,
    }
}

/// Medium-size cover image URL for an ISBN
pub fn cover_url(covers_base: &str, isbn: &str) -> String {
    format!("{}/b/isbn/{}-M.jpg", covers_base.trim_end_matches('/'), isbn)
}
