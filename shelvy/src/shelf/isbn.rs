//! ISBN normalisation, validation and 10/13 conversion.

use serde::Serialize;
use utoipa::ToSchema;

/// Strip spaces and hyphens and upper-case a trailing `x`.
///
/// Returns `None` unless the result looks like an ISBN-10 (nine digits then a digit or `X`) or an
/// ISBN-13 (thirteen digits). Checksums are not verified here.
pub fn normalize(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let bytes = cleaned.as_bytes();
    match bytes.len() {
        10 => {
            let (body, check) = bytes.split_at(9);
            (body.iter().all(u8::is_ascii_digit) && (check[0].is_ascii_digit() || check[0] == b'X')).then_some(cleaned)
        }
        13 => bytes.iter().all(u8::is_ascii_digit).then_some(cleaned),
        _ => None,
    }
}

fn digit(b: u8) -> u32 {
    (b - b'0') as u32
}

/// Weighted mod-11 check: weights 10 down to 1, `X` only valid as the check digit.
pub fn is_valid_isbn10(isbn: &str) -> bool {
    let bytes = isbn.as_bytes();
    if bytes.len() != 10 {
        return false;
    }
    let mut sum = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let value = match b {
            b'0'..=b'9' => digit(b),
            b'X' if i == 9 => 10,
            _ => return false,
        };
        sum += value * (10 - i as u32);
    }
    sum % 11 == 0
}

/// EAN-13 check: alternating weights 1 and 3.
pub fn is_valid_isbn13(isbn: &str) -> bool {
    let bytes = isbn.as_bytes();
    if bytes.len() != 13 || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }
    ean13_check_digit(&bytes[..12]) == digit(bytes[12])
}

fn ean13_check_digit(first_twelve: &[u8]) -> u32 {
    let sum: u32 = first_twelve
        .iter()
        .enumerate()
        .map(|(i, &b)| digit(b) * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    (10 - sum % 10) % 10
}

fn isbn10_check_char(first_nine: &[u8]) -> char {
    let sum: u32 = first_nine
        .iter()
        .enumerate()
        .map(|(i, &b)| digit(b) * (10 - i as u32))
        .sum();
    match (11 - sum % 11) % 11 {
        10 => 'X',
        d => char::from_digit(d, 10).unwrap_or('0'),
    }
}

/// Convert an ISBN-13 to its ISBN-10 form.
///
/// Only `978`-prefixed ISBNs have an ISBN-10; `979` and anything malformed give `None`.
pub fn isbn13_to_isbn10(isbn13: &str) -> Option<String> {
    let isbn13 = normalize(isbn13)?;
    if isbn13.len() != 13 || !isbn13.starts_with("978") {
        return None;
    }
    let body = &isbn13.as_bytes()[3..12];
    let mut out = String::with_capacity(10);
    out.push_str(&isbn13[3..12]);
    out.push(isbn10_check_char(body));
    Some(out)
}

/// Convert an ISBN-10 to ISBN-13 by prefixing `978` and recomputing the check digit.
pub fn isbn10_to_isbn13(isbn10: &str) -> Option<String> {
    let isbn10 = normalize(isbn10)?;
    if isbn10.len() != 10 {
        return None;
    }
    let mut out = format!("978{}", &isbn10[..9]);
    let check = ean13_check_digit(out.as_bytes());
    out.push_str(&check.to_string());
    Some(out)
}

/// Both forms of a book's ISBN, where derivable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Isbn {
    pub isbn13: Option<String>,
    pub isbn10: Option<String>,
}

impl Isbn {
    /// Parse user or provider input. Returns `None` when the input is not a checksum-valid ISBN.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw)?;
        match normalized.len() {
            13 if is_valid_isbn13(&normalized) => Some(Self {
                isbn10: isbn13_to_isbn10(&normalized),
                isbn13: Some(normalized),
            }),
            10 if is_valid_isbn10(&normalized) => Some(Self {
                isbn13: isbn10_to_isbn13(&normalized),
                isbn10: Some(normalized),
            }),
            _ => None,
        }
    }

    /// Preferred lookup key: ISBN-13 when known.
    pub fn preferred(&self) -> Option<&str> {
        self.isbn13.as_deref().or(self.isbn10.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isbn13_to_isbn10_known_value() {
        assert_eq!(isbn13_to_isbn10("9780306406157").as_deref(), Some("0306406152"));
        assert_eq!(isbn13_to_isbn10("978-0-306-40615-7").as_deref(), Some("0306406152"));
    }

    #[test]
    fn test_isbn13_to_isbn10_x_check_digit() {
        assert_eq!(isbn13_to_isbn10("9780804429573").as_deref(), Some("080442957X"));
    }

    #[test]
    fn test_979_prefix_has_no_isbn10() {
        assert_eq!(isbn13_to_isbn10("9791032305690"), None);
    }

    #[test]
    fn test_isbn10_to_isbn13() {
        assert_eq!(isbn10_to_isbn13("0306406152").as_deref(), Some("9780306406157"));
        assert_eq!(isbn10_to_isbn13("080442957x").as_deref(), Some("9780804429573"));
    }

    #[test]
    fn test_normalize_shapes() {
        assert_eq!(normalize(" 0-306-40615-2 ").as_deref(), Some("0306406152"));
        assert_eq!(normalize("080442957x").as_deref(), Some("080442957X"));
        assert_eq!(normalize("12345"), None);
        assert_eq!(normalize("X306406152"), None);
        assert_eq!(normalize("97803064061X7"), None);
    }

    #[test]
    fn test_checksums() {
        assert!(is_valid_isbn10("0306406152"));
        assert!(!is_valid_isbn10("0306406153"));
        assert!(is_valid_isbn10("080442957X"));
        assert!(is_valid_isbn13("9780306406157"));
        assert!(!is_valid_isbn13("9780306406158"));
    }

    #[test]
    fn test_parse_both_forms() {
        let isbn = Isbn::parse("978-0-306-40615-7").unwrap();
        assert_eq!(isbn.isbn13.as_deref(), Some("9780306406157"));
        assert_eq!(isbn.isbn10.as_deref(), Some("0306406152"));

        let isbn = Isbn::parse("0306406152").unwrap();
        assert_eq!(isbn.preferred(), Some("9780306406157"));

        assert!(Isbn::parse("9780306406158").is_none());
    }
}
