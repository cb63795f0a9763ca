//! Rule-based field extractors for Japanese invoices.

pub mod amounts;
pub mod bank;
pub mod basic;
pub mod cascade;
pub mod contact;
pub mod dates;
pub mod normalize;
pub mod parties;
pub mod patterns;
pub mod registration;

pub use amounts::{
    extract_amounts, parse_amount, reconcile, AmountExtractor, InvoiceAmounts, ReconciledAmounts,
    ReconciliationTier,
};
pub use bank::{extract_bank_details, BankDetails, BankExtractor};
pub use basic::{extract_basic_info, BasicInfoExtractor, ExtractedBasicInfo};
pub use cascade::{AnchorHit, AnchorScan, Cascade, Rule};
pub use contact::{extract_email, extract_phone, format_phone, EmailExtractor, PhoneExtractor};
pub use dates::{
    extract_dates, normalize_date, parse_date, DateCascades, DateExtractor, InvoiceDates,
};
pub use normalize::{normalize, split_lines};
pub use parties::{
    extract_parties, has_corporate_marker, normalize_company_name, Parties, PartyExtractor,
};
pub use registration::{extract_registration_number, RegistrationNumberExtractor};

use crate::models::invoice::ExtractedField;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    /// Drop the match context, keeping value and confidence.
    pub fn into_field(self) -> ExtractedField<T> {
        ExtractedField::new(self.value, self.confidence)
    }
}
