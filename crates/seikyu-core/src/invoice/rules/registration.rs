//! Qualified-invoice registration number (適格請求書発行事業者登録番号).
//!
//! The number is `T` followed by 13 digits. OCR regularly misreads the
//! leading `T` as `イ`, `1`, `l`, `I` or an opening bracket; these are
//! repaired before validation.

use lazy_static::lazy_static;
use regex::Regex;

use super::cascade::{Cascade, Rule};
use super::normalize::fold_width;
use super::patterns::{REGISTRATION_NUMBER, REGISTRATION_NUMBER_STANDALONE};
use super::{ExtractionMatch, FieldExtractor};

lazy_static! {
    static ref T_NUMBER: Regex = Regex::new(r"^T\d{13}$").unwrap();
}

/// Registration number extractor.
#[derive(Debug)]
pub struct RegistrationNumberExtractor {
    cascade: Cascade<String>,
}

impl RegistrationNumberExtractor {
    pub fn new() -> Self {
        Self {
            cascade: Cascade::new("registration_number")
                .rule(Rule::pattern(&REGISTRATION_NUMBER, 0.95, validate_registration_number))
                .rule(Rule::pattern(
                    &REGISTRATION_NUMBER_STANDALONE,
                    0.7,
                    validate_registration_number,
                )),
        }
    }
}

impl Default for RegistrationNumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for RegistrationNumberExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.cascade.extract(text)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();

        // Labeled and bare rules overlap; keep the first (labeled) hit.
        for found in self.cascade.extract_all(text) {
            if !results.iter().any(|r| r.value == found.value) {
                results.push(found);
            }
        }

        results
    }
}

/// Extract the registration number from text.
pub fn extract_registration_number(text: &str) -> Option<String> {
    RegistrationNumberExtractor::new().extract(text).map(|m| m.value)
}

/// Repair and validate a registration number candidate.
///
/// Returns the canonical `T` + 13 digit form.
pub fn validate_registration_number(candidate: &str) -> Option<String> {
    let compact: String = fold_width(candidate)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let mut chars = compact.chars();
    let lead = chars.next()?;
    let rest = chars.as_str();

    // A misread "1" is only a lead when it leaves exactly 13 digits.
    let repaired = match lead {
        'T' | 'イ' | '1' | 'l' | 'I' | '『' | '｢' | '「' => format!("T{rest}"),
        _ => return None,
    };

    T_NUMBER.is_match(&repaired).then_some(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_labeled_registration_number() {
        assert_eq!(
            extract_registration_number("登録番号: T1234567890123"),
            Some("T1234567890123".to_string())
        );
        assert_eq!(
            extract_registration_number("適格請求書発行事業者登録番号：Ｔ１２３４５６７８９０１２３"),
            Some("T1234567890123".to_string())
        );
    }

    #[test]
    fn test_repairs_misread_prefix() {
        assert_eq!(
            extract_registration_number("登録番号: イ1234567890123"),
            Some("T1234567890123".to_string())
        );
        assert_eq!(
            extract_registration_number("登録番号 「1234567890123"),
            Some("T1234567890123".to_string())
        );
    }

    #[test]
    fn test_spaced_digits() {
        assert_eq!(
            extract_registration_number("登録番号 T 1234 5678 9012 3"),
            Some("T1234567890123".to_string())
        );
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(extract_registration_number("登録番号: T123456789012"), None);
        assert_eq!(extract_registration_number("登録番号: T12345678901234"), None);
    }

    #[test]
    fn test_bare_number_lower_confidence() {
        let found = RegistrationNumberExtractor::new()
            .extract("株式会社サンプル T9876543210987")
            .unwrap();
        assert_eq!(found.value, "T9876543210987");
        assert_eq!(found.confidence, 0.7);
    }

    #[test]
    fn test_extract_all_deduplicates() {
        let all = RegistrationNumberExtractor::new().extract_all("登録番号: T1234567890123");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].confidence, 0.95);
    }

    #[test]
    fn test_validate_registration_number() {
        assert_eq!(validate_registration_number("l1234567890123"), Some("T1234567890123".into()));
        assert_eq!(validate_registration_number("X1234567890123"), None);
        assert_eq!(validate_registration_number(""), None);
    }
}
