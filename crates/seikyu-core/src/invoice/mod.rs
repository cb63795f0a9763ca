//! Invoice field extraction module.

mod assembler;
pub mod confidence;
pub mod line_items;
pub mod rules;

pub use assembler::{result_id, DocumentInput, InvoiceDataAssembler, RESULT_VERSION};
pub use confidence::{ConfidenceScorer, ScoredFields};
pub use line_items::LineItemTableExtractor;

use crate::models::invoice::InvoiceExtractionResult;

/// Trait for whole-document invoice extractors.
pub trait InvoiceExtractor {
    /// Extract the structured record for one recognized document.
    fn extract(&self, input: &DocumentInput) -> InvoiceExtractionResult;

    /// Extract from bare text, with no file name or hash.
    fn extract_from_text(&self, text: &str) -> InvoiceExtractionResult {
        self.extract(&DocumentInput::new(text, "", ""))
    }
}
