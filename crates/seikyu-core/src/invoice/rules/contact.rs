//! Phone number and email extraction.

use super::cascade::{Cascade, Rule};
use super::normalize::fold_width;
use super::patterns::{EMAIL, EMAIL_LABELED, PHONE_LABELED, PHONE_STANDALONE};
use super::{ExtractionMatch, FieldExtractor};

/// Issuer phone number extractor.
///
/// Lines mentioning FAX are ignored by the unlabeled rule so the fax
/// number printed next to the phone number is not picked up.
#[derive(Debug)]
pub struct PhoneExtractor {
    cascade: Cascade<String>,
}

impl PhoneExtractor {
    pub fn new() -> Self {
        Self {
            cascade: Cascade::new("phone")
                .rule(Rule::pattern(&PHONE_LABELED, 0.9, validate_phone))
                .rule(Rule::finder(bare_phone_candidates, 0.6, validate_phone)),
        }
    }
}

impl Default for PhoneExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for PhoneExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.cascade.extract(text)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.cascade.extract_all(text)
    }
}

fn is_fax_line(line: &str) -> bool {
    let upper = fold_width(line).to_uppercase();
    upper.contains("FAX") || line.contains("ファックス") || line.contains("ファクス")
}

fn bare_phone_candidates(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !is_fax_line(line))
        .flat_map(|line| {
            PHONE_STANDALONE
                .captures_iter(line)
                .map(|caps| caps[1].to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Validate a Japanese phone number candidate and format it with hyphens.
///
/// Accepts 10 or 11 digits starting with `0`; `+81` is rewritten to the
/// domestic trunk prefix.
pub fn validate_phone(candidate: &str) -> Option<String> {
    // Labeled matches may run into the next line.
    let line = candidate.lines().next()?;
    let folded = fold_width(line);
    let trimmed = folded.trim();

    let mut digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if trimmed.starts_with('+') {
        digits = format!("0{}", digits.strip_prefix("81")?);
    }

    let valid = matches!(digits.len(), 10 | 11) && digits.starts_with('0');
    valid.then(|| format_phone(&digits))
}

/// Format a digit-only Japanese phone number with hyphens.
///
/// Free-dial numbers (0120, 0800) and the two-digit Tokyo/Osaka area codes
/// get their own grouping; other lengths are returned unchanged.
pub fn format_phone(digits: &str) -> String {
    let group = |sizes: &[usize]| {
        let mut parts = Vec::with_capacity(sizes.len());
        let mut start = 0;
        for size in sizes {
            parts.push(&digits[start..start + size]);
            start += size;
        }
        parts.join("-")
    };

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return digits.to_string();
    }

    match digits.len() {
        10 if digits.starts_with("0120") => group(&[4, 3, 3]),
        11 if digits.starts_with("0800") => group(&[4, 3, 4]),
        11 => group(&[3, 4, 4]),
        10 if digits.starts_with("03") || digits.starts_with("06") => group(&[2, 4, 4]),
        10 => group(&[3, 3, 4]),
        _ => digits.to_string(),
    }
}

/// Issuer email extractor.
#[derive(Debug)]
pub struct EmailExtractor {
    cascade: Cascade<String>,
}

impl EmailExtractor {
    pub fn new() -> Self {
        Self {
            cascade: Cascade::new("email")
                .rule(Rule::pattern(&EMAIL_LABELED, 0.95, validate_email))
                .rule(Rule::pattern(&EMAIL, 0.7, validate_email)),
        }
    }
}

impl Default for EmailExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for EmailExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.cascade.extract(text)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.cascade.extract_all(text)
    }
}

/// Validate an email address: one `@`, a dotted domain and an
/// alphabetic top-level domain of at least two letters.
pub fn validate_email(candidate: &str) -> Option<String> {
    let email = candidate.trim().trim_end_matches('.');
    let (local, domain) = email.split_once('@')?;

    if local.is_empty() || domain.contains('@') {
        return None;
    }

    let (host, tld) = domain.rsplit_once('.')?;
    if host.is_empty() || tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some(email.to_string())
}

/// Extract the issuer phone number from text.
pub fn extract_phone(text: &str) -> Option<String> {
    PhoneExtractor::new().extract(text).map(|m| m.value)
}

/// Extract the issuer email from text.
pub fn extract_email(text: &str) -> Option<String> {
    EmailExtractor::new().extract(text).map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_labeled_phone() {
        assert_eq!(extract_phone("TEL: 03-1234-5678"), Some("03-1234-5678".to_string()));
        assert_eq!(extract_phone("電話番号：０６－１２３４－５６７８"), Some("06-1234-5678".to_string()));
    }

    #[test]
    fn test_labeled_phone_stops_at_line_end() {
        let text = "TEL 045-123-4567\n2024/11/24";
        assert_eq!(extract_phone(text), Some("045-123-4567".to_string()));
    }

    #[test]
    fn test_bare_phone_skips_fax_line() {
        let text = "FAX 03-9999-0000\n03-1234-5678";
        let found = PhoneExtractor::new().extract(text).unwrap();
        assert_eq!(found.value, "03-1234-5678");
        assert_eq!(found.confidence, 0.6);
    }

    #[test]
    fn test_international_prefix() {
        assert_eq!(validate_phone("+81-3-1234-5678"), Some("03-1234-5678".to_string()));
        assert_eq!(validate_phone("+1-555-123-4567"), None);
    }

    #[test]
    fn test_phone_rejects_wrong_length() {
        assert_eq!(validate_phone("03-1234-567"), None);
        assert_eq!(validate_phone("12-3456-7890"), None);
    }

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("09012345678"), "090-1234-5678");
        assert_eq!(format_phone("0120123456"), "0120-123-456");
        assert_eq!(format_phone("08001234567"), "0800-123-4567");
        assert_eq!(format_phone("0312345678"), "03-1234-5678");
        assert_eq!(format_phone("0451234567"), "045-123-4567");
        assert_eq!(format_phone("12345"), "12345");
    }

    #[test]
    fn test_email() {
        assert_eq!(
            extract_email("E-mail: billing@example.co.jp"),
            Some("billing@example.co.jp".to_string())
        );
        let found = EmailExtractor::new().extract("連絡先 info@example.com まで").unwrap();
        assert_eq!(found.value, "info@example.com");
        assert_eq!(found.confidence, 0.7);
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("a@b.jp."), Some("a@b.jp".to_string()));
        assert_eq!(validate_email("a@b.c"), None);
        assert_eq!(validate_email("a@b.12"), None);
        assert_eq!(validate_email("@b.com"), None);
        assert_eq!(validate_email("nodomain"), None);
    }
}
